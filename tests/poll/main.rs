// Integration tests for the polling core.
//
// Collaborators are replaced by deterministic doubles from `helpers`; only
// the repository tests touch a real database (Docker required, ignored by
// default).

mod helpers;
mod test_health;
mod test_processor;
mod test_service;
