//! Line-oriented terminal access.
//!
//! Every prompt, rendered step and typed answer goes through a [`Console`],
//! so the whole dialogue can be driven from memory in tests.

use std::io::{self, BufRead, BufReader, Write};

use super::InputError;

/// A blocking line reader paired with an output sink.
pub struct Console {
    /// Source of typed lines
    input: Box<dyn BufRead + Send>,

    /// Where prompts and rendered content go
    output: Box<dyn Write + Send>,
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console").finish_non_exhaustive()
    }
}

impl Console {
    /// Create a console from an arbitrary reader and writer.
    pub fn new(input: impl BufRead + Send + 'static, output: impl Write + Send + 'static) -> Self {
        Self { input: Box::new(input), output: Box::new(output) }
    }

    /// Console bound to the process stdin/stdout.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }

    /// Block for one line of input, without the trailing line break.
    ///
    /// Returns [`InputError::Closed`] at end of input.
    pub fn read_line(&mut self) -> Result<String, InputError> {
        self.output.flush()?;

        let mut line = String::new();
        let read = self.input.read_line(&mut line)?;
        if read == 0 {
            return Err(InputError::Closed);
        }

        let trimmed = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed);
        Ok(line)
    }
}

impl Write for Console {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.output.flush()
    }
}


#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::testing::scripted;
    use crate::input::InputError;

    #[test]
    fn test_read_line_strips_line_endings() {
        let (mut console, _) = scripted(&["yes\r", "no"]);
        assert_eq!(console.read_line().unwrap(), "yes");
        assert_eq!(console.read_line().unwrap(), "no");
    }

    #[test]
    fn test_read_line_reports_end_of_input() {
        let (mut console, _) = scripted(&[]);
        assert!(matches!(console.read_line(), Err(InputError::Closed)));
    }

    #[test]
    fn test_writes_reach_output() {
        let (mut console, output) = scripted(&[]);
        writeln!(console, "Step 1").unwrap();
        assert_eq!(output.contents(), "Step 1\n");
    }
}
