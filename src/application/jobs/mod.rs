mod redrive;

pub use redrive::{
    RedriveDeadLettersContext, RedriveDeadLettersJob, process_redrive_dead_letters_job,
    redrive_schedule,
};
