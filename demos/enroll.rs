//! Minimal enrollment walkthrough: get-or-create a secret for an email
//! address, print the provisioning URI and the current code.
//!
//! Distinct failure kinds map to distinct exit codes so scripts can tell
//! a typo'd email from a clock problem.

use std::process::ExitCode;

use totp_enroll::{EnrollError, Enrollment, MemoryStore};

fn main() -> ExitCode {
    let email = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "example@example.com".to_string());

    let mut enrollment = Enrollment::new(MemoryStore::new(), "OTP App");
    let (record, uri) = match enrollment.enroll(&email) {
        Ok(done) => done,
        Err(e @ EnrollError::InvalidIdentity(_)) => {
            eprintln!("otp: {}", e);
            return ExitCode::from(2);
        }
        Err(e) => {
            eprintln!("otp: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("uri:    {}", uri);
    println!("secret: {}", record.secret_base32());
    match record.current_code() {
        Ok(code) => {
            println!("code:   {}", code);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("otp: {}", e);
            ExitCode::FAILURE
        }
    }
}
