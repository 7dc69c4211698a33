//! Interactive stdin prompting with validation.
//!
//! Prompts are written to stderr so that piping stdout stays clean. Invalid
//! answers re-prompt in a loop; the validator decides what counts as valid.

use std::io::{stderr, stdin, Write};

/// Prompt until the validator accepts the (trimmed) input line.
pub fn raw<S, F>(prompt: &str, validator: F) -> S
where
    F: for<'a> Fn(&'a str) -> Result<S, String>,
{
    loop {
        eprint!("{prompt} : ");
        stderr().flush().unwrap();
        let mut input = String::new();
        stdin()
            .read_line(&mut input)
            .unwrap_or_else(|_| panic!("Error reading for prompt: {prompt}"));
        match validator(input.trim()) {
            Ok(res) => return res,
            Err(e) => eprintln!("Invalid input: {e}. Try again"),
        }
    }
}

/// Like [`raw`], but an empty answer selects the default.
pub fn with_default<S, F>(prompt: &str, default: &str, validator: F) -> S
where
    F: for<'a> Fn(&'a str) -> Result<S, String>,
{
    raw(&format!("{prompt} [{default}]"), |x| {
        if x.is_empty() {
            validator(default)
        } else {
            validator(x)
        }
    })
}
