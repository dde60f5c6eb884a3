mod progress_tracker_test;
mod queue_consumer_test;
