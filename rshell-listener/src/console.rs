//! Stateless presentation helpers for the operator console. Session output
//! and status lines go here; operational logging stays on `tracing`.

pub const RED: &str = "\x1b[91m";
pub const GREEN: &str = "\x1b[92m";
pub const YELLOW: &str = "\x1b[93m";
pub const CYAN: &str = "\x1b[96m";
pub const BOLD: &str = "\x1b[1m";
pub const RESET: &str = "\x1b[0m";

pub fn info(message: &str) {
    println!("{}[INFO] {}{}", CYAN, message, RESET);
}

pub fn success(message: &str) {
    println!("{}{}[OK] {}{}", GREEN, BOLD, message, RESET);
}

pub fn warn(message: &str) {
    println!("{}[WARN] {}{}", YELLOW, message, RESET);
}

pub fn error(message: &str) {
    eprintln!("{}[ERROR] {}{}", RED, message, RESET);
}

pub fn prompt(peer_ip: &str) -> String {
    format!("{}shell@{}${} ", BOLD, peer_ip, RESET)
}
