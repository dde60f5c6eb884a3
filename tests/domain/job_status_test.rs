use rowstream::domain::{JobStatus, StatusVocabulary};

#[test]
fn given_standard_vocabulary_when_labelling_then_completed_labels_are_used() {
    assert_eq!(JobStatus::Completed.label(StatusVocabulary::Standard), "COMPLETED");
    assert_eq!(
        JobStatus::CompletedWithErrors.label(StatusVocabulary::Standard),
        "COMPLETED_WITH_ERRORS"
    );
    assert_eq!(JobStatus::Failed.label(StatusVocabulary::Standard), "FAILED");
}

#[test]
fn given_legacy_vocabulary_when_labelling_then_done_labels_are_used() {
    assert_eq!(JobStatus::Completed.label(StatusVocabulary::Legacy), "DONE");
    assert_eq!(
        JobStatus::CompletedWithErrors.label(StatusVocabulary::Legacy),
        "DONE_WITH_ERRORS"
    );
    assert_eq!(JobStatus::Failed.label(StatusVocabulary::Legacy), "ERROR");
    assert_eq!(JobStatus::Pending.label(StatusVocabulary::Legacy), "PENDING");
}

#[test]
fn given_either_vocabulary_when_parsing_then_same_status_is_returned() {
    assert_eq!("DONE".parse::<JobStatus>(), Ok(JobStatus::Completed));
    assert_eq!("COMPLETED".parse::<JobStatus>(), Ok(JobStatus::Completed));
    assert_eq!("ERROR".parse::<JobStatus>(), Ok(JobStatus::Failed));
    assert_eq!(
        "DONE_WITH_ERRORS".parse::<JobStatus>(),
        Ok(JobStatus::CompletedWithErrors)
    );
    assert!("QUEUED".parse::<JobStatus>().is_err());
}

#[test]
fn given_terminal_status_when_checking_transitions_then_no_edge_leaves_it() {
    let all = [
        JobStatus::Pending,
        JobStatus::Processing,
        JobStatus::Completed,
        JobStatus::CompletedWithErrors,
        JobStatus::Failed,
    ];
    for from in all.into_iter().filter(JobStatus::is_terminal) {
        for to in all {
            assert!(!from.can_transition_to(to), "{from} -> {to} must be rejected");
        }
    }
}

#[test]
fn given_pending_job_when_checking_transitions_then_only_processing_and_failed_allowed() {
    assert!(JobStatus::Pending.can_transition_to(JobStatus::Processing));
    assert!(JobStatus::Pending.can_transition_to(JobStatus::Failed));
    assert!(!JobStatus::Pending.can_transition_to(JobStatus::Completed));
    assert!(!JobStatus::Pending.can_transition_to(JobStatus::CompletedWithErrors));
}

#[test]
fn given_error_rows_when_stream_exhausted_then_completed_with_errors() {
    assert_eq!(JobStatus::for_exhausted_stream(0), JobStatus::Completed);
    assert_eq!(
        JobStatus::for_exhausted_stream(2),
        JobStatus::CompletedWithErrors
    );
}
