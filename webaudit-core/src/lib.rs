use colored::Colorize;

pub mod audit;
pub mod checkpoint;
pub mod config;
pub mod crawl;
pub mod data;
pub mod error;
pub mod frontier;
pub mod links;
pub mod orchestrator;
pub mod rapport;
pub mod security;

pub use config::{AuditConfig, AuditContext};
pub use crawl::{AuditProgressCallback, AuditSummary, execute_audit, generate_audit_report};
pub use error::{CoreError, Result};

pub fn print_banner() {
    let banner = r#"
 ██╗    ██╗███████╗██████╗  █████╗ ██╗   ██╗██████╗ ██╗████████╗
 ██║    ██║██╔════╝██╔══██╗██╔══██╗██║   ██║██╔══██╗██║╚══██╔══╝
 ██║ █╗ ██║█████╗  ██████╔╝███████║██║   ██║██║  ██║██║   ██║
 ██║███╗██║██╔══╝  ██╔══██╗██╔══██║██║   ██║██║  ██║██║   ██║
 ╚███╔███╔╝███████╗██████╔╝██║  ██║╚██████╔╝██████╔╝██║   ██║
  ╚══╝╚══╝ ╚══════╝╚═════╝ ╚═╝  ╚═╝ ╚═════╝ ╚═════╝ ╚═╝   ╚═╝"#;
    println!("{}", banner.bright_cyan().bold());
    println!(
        "  {} v{}\n",
        "crawl, audit, resume".bright_black(),
        env!("CARGO_PKG_VERSION")
    );
}
