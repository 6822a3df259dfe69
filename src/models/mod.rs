pub mod project;
pub mod record;
pub mod running_session;
