// pagemark state managers
// Managers own page state: the navigation cursor, persisted highlights,
// the highlight request scheduler and the per-page session.

pub mod highlight_scheduler;
pub mod highlight_store;
pub mod navigation_manager;
pub mod page_session;
