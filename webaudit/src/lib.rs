// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    build_audit_config, expand_path, handle_audit, load_analyzer_overrides, open_store,
    select_analyzers,
};

// Re-export the audit entry points from webaudit-core
pub use webaudit_core::crawl::{
    AuditProgressCallback, AuditSummary, execute_audit, generate_audit_report,
};
