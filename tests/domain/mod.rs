mod job_status_test;
mod row_test;
