pub mod calendar_event;
pub mod discipline;
pub mod evaluation;
pub mod gamification;
pub mod library_material;
pub mod notification;
pub mod push_subscription;
pub mod study_group;
