//! The text/voice input channel.

use std::io::Write;

use super::{parse_choice, Console, InputError, InputMode, SpeechCapture};

/// Typed answer that switches a text session over to voice.
pub const DEFAULT_VOICE_SENTINEL: &str = "404";

/// Blocking prompt/answer channel with automatic mode fallback.
///
/// Exactly one request is outstanding at a time. Retries (mode switches,
/// unrecognised choices, empty transcriptions) re-issue the same prompt
/// until the user produces a usable answer.
pub struct InputChannel {
    /// Current acquisition mode
    mode: InputMode,

    /// Terminal used for prompts and typed answers
    console: Console,

    /// Voice backend, if one is configured
    speech: Option<Box<dyn SpeechCapture>>,

    /// Typed value that switches to voice mode
    voice_sentinel: String,
}

impl std::fmt::Debug for InputChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputChannel")
            .field("mode", &self.mode)
            .field("speech", &self.speech.is_some())
            .field("voice_sentinel", &self.voice_sentinel)
            .finish()
    }
}

impl InputChannel {
    /// Create a channel in the given mode with no voice backend.
    pub fn new(mode: InputMode, console: Console) -> Self {
        Self { mode, console, speech: None, voice_sentinel: DEFAULT_VOICE_SENTINEL.to_string() }
    }

    /// Attach a voice backend.
    pub fn with_speech(mut self, speech: Box<dyn SpeechCapture>) -> Self {
        self.speech = Some(speech);
        self
    }

    /// Override the typed value that switches to voice mode.
    pub fn with_voice_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.voice_sentinel = sentinel.into();
        self
    }

    /// Get the current mode.
    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Set the current mode.
    pub fn set_mode(&mut self, mode: InputMode) {
        if self.mode != mode {
            tracing::info!(from = %self.mode, to = %mode, "Input mode changed");
        }
        self.mode = mode;
    }

    /// The console used for prompts, for rendering content alongside them.
    pub fn console(&mut self) -> &mut Console {
        &mut self.console
    }

    /// Ask `prompt` and return the answer as text.
    pub fn get_input(&mut self, prompt: &str) -> Result<String, InputError> {
        self.request(prompt, false, None)
    }

    /// Ask `prompt` and return a selection in `1..=max_choice`.
    ///
    /// Unrecognised or out-of-range answers are rejected and the prompt is
    /// shown again.
    pub fn get_choice(&mut self, prompt: &str, max_choice: Option<u32>) -> Result<u32, InputError> {
        loop {
            let answer = self.acquire(prompt)?;

            let Some(choice) = parse_choice(&answer) else {
                writeln!(self.console, "Could not understand selection.")?;
                continue;
            };

            if let Some(max) = max_choice {
                if !(1..=max).contains(&choice) {
                    writeln!(self.console, "Choice out of range (1-{max}).")?;
                    continue;
                }
            }

            return Ok(choice);
        }
    }

    /// Ask `prompt`, optionally requiring a numeric selection.
    ///
    /// With `expect_choice` set the selection is returned rendered as a
    /// string, e.g. `"3"` for the answer "option three".
    pub fn request(
        &mut self,
        prompt: &str,
        expect_choice: bool,
        max_choice: Option<u32>,
    ) -> Result<String, InputError> {
        if expect_choice {
            return self.get_choice(prompt, max_choice).map(|choice| choice.to_string());
        }
        self.acquire(prompt)
    }

    /// Show the prompt and obtain one raw answer in whichever mode is active.
    fn acquire(&mut self, prompt: &str) -> Result<String, InputError> {
        loop {
            writeln!(self.console, "{prompt}")?;

            match self.mode {
                InputMode::Text => {
                    write!(self.console, "> ")?;
                    let line = self.console.read_line()?;
                    let answer = line.trim();

                    if answer == self.voice_sentinel {
                        writeln!(self.console, "Switching to VOICE mode")?;
                        self.set_mode(InputMode::Voice);
                        continue;
                    }

                    return Ok(answer.to_string());
                }
                InputMode::Voice => match self.listen() {
                    Ok(transcript) if !transcript.trim().is_empty() => {
                        let transcript = transcript.trim().to_string();
                        writeln!(self.console, "Heard: {transcript}")?;
                        return Ok(transcript);
                    }
                    Ok(_) => {
                        writeln!(self.console, "No speech detected, switching to TEXT")?;
                        self.set_mode(InputMode::Text);
                    }
                    Err(InputError::Voice(reason)) => {
                        tracing::warn!(error = %reason, "Voice capture failed");
                        writeln!(self.console, "Voice input failed ({reason}), switching to TEXT")?;
                        self.set_mode(InputMode::Text);
                    }
                    Err(e) => return Err(e),
                },
            }
        }
    }

    fn listen(&mut self) -> Result<String, InputError> {
        match self.speech.as_mut() {
            Some(speech) => speech.capture(&mut self.console),
            None => Err(InputError::Voice("no voice backend configured".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::input::testing::scripted;

    /// Voice backend that replays canned transcripts and counts captures.
    struct CannedSpeech {
        transcripts: VecDeque<Result<String, InputError>>,
        calls: Arc<Mutex<usize>>,
    }

    impl CannedSpeech {
        fn new(transcripts: Vec<Result<String, InputError>>) -> (Self, Arc<Mutex<usize>>) {
            let calls = Arc::new(Mutex::new(0));
            (Self { transcripts: transcripts.into(), calls: Arc::clone(&calls) }, calls)
        }
    }

    impl SpeechCapture for CannedSpeech {
        fn capture(&mut self, _console: &mut Console) -> Result<String, InputError> {
            *self.calls.lock() += 1;
            self.transcripts.pop_front().unwrap_or(Err(InputError::Closed))
        }
    }

    #[test]
    fn test_text_mode_returns_trimmed_line() {
        let (console, output) = scripted(&["  yes  "]);
        let mut channel = InputChannel::new(InputMode::Text, console);

        assert_eq!(channel.get_input("Confirm:").unwrap(), "yes");
        assert!(output.contents().contains("Confirm:"));
    }

    #[test]
    fn test_sentinel_switches_to_voice_and_retries() {
        let (console, output) = scripted(&["404"]);
        let (speech, calls) = CannedSpeech::new(vec![Ok("yes please".to_string())]);
        let mut channel = InputChannel::new(InputMode::Text, console).with_speech(Box::new(speech));

        let answer = channel.get_input("Finished step 1:").unwrap();

        assert_eq!(answer, "yes please");
        assert_eq!(channel.mode(), InputMode::Voice);
        assert_eq!(*calls.lock(), 1);

        let text = output.contents();
        assert_eq!(text.matches("Finished step 1:").count(), 2);
        assert!(text.contains("Heard: yes please"));
    }

    #[test]
    fn test_custom_sentinel() {
        let (console, _) = scripted(&["404", "voice"]);
        let (speech, _) = CannedSpeech::new(vec![Ok("ok".to_string())]);
        let mut channel = InputChannel::new(InputMode::Text, console)
            .with_speech(Box::new(speech))
            .with_voice_sentinel("voice");

        assert_eq!(channel.get_input("?").unwrap(), "404");
        assert_eq!(channel.get_input("?").unwrap(), "ok");
    }

    #[test]
    fn test_empty_transcription_falls_back_to_text() {
        let (console, output) = scripted(&["typed answer"]);
        let (speech, calls) = CannedSpeech::new(vec![Ok("   ".to_string())]);
        let mut channel =
            InputChannel::new(InputMode::Voice, console).with_speech(Box::new(speech));

        let answer = channel.get_input("Confirm:").unwrap();

        assert_eq!(answer, "typed answer");
        assert_eq!(channel.mode(), InputMode::Text);
        assert_eq!(*calls.lock(), 1);
        assert!(output.contents().contains("No speech detected"));
    }

    #[test]
    fn test_voice_failure_falls_back_to_text() {
        let (console, _) = scripted(&["y"]);
        let (speech, _) = CannedSpeech::new(vec![Err(InputError::Voice("no mic".to_string()))]);
        let mut channel =
            InputChannel::new(InputMode::Voice, console).with_speech(Box::new(speech));

        assert_eq!(channel.get_input("Confirm:").unwrap(), "y");
        assert_eq!(channel.mode(), InputMode::Text);
    }

    #[test]
    fn test_voice_without_backend_falls_back_to_text() {
        let (console, _) = scripted(&["y"]);
        let mut channel = InputChannel::new(InputMode::Voice, console);

        assert_eq!(channel.get_input("Confirm:").unwrap(), "y");
        assert_eq!(channel.mode(), InputMode::Text);
    }

    #[test]
    fn test_choice_retries_until_parsable() {
        let (console, output) = scripted(&["banana", "option two"]);
        let mut channel = InputChannel::new(InputMode::Text, console);

        assert_eq!(channel.get_choice("Select option (number):", Some(3)).unwrap(), 2);

        let text = output.contents();
        assert!(text.contains("Could not understand selection."));
        assert_eq!(text.matches("Select option (number):").count(), 2);
    }

    #[test]
    fn test_choice_rejects_out_of_range() {
        let (console, output) = scripted(&["0", "4", "3"]);
        let mut channel = InputChannel::new(InputMode::Text, console);

        assert_eq!(channel.get_choice("Pick:", Some(3)).unwrap(), 3);
        assert_eq!(output.contents().matches("Choice out of range").count(), 2);
    }

    #[test]
    fn test_choice_without_upper_bound() {
        let (console, _) = scripted(&["202"]);
        let mut channel = InputChannel::new(InputMode::Text, console);

        assert_eq!(channel.get_choice("Pick:", None).unwrap(), 202);
    }

    #[test]
    fn test_request_renders_choice_as_string() {
        let (console, _) = scripted(&["number seven"]);
        let mut channel = InputChannel::new(InputMode::Text, console);

        assert_eq!(channel.request("Pick:", true, Some(10)).unwrap(), "7");
    }

    #[test]
    fn test_voice_choice_is_parsed() {
        let (console, _) = scripted(&[]);
        let (speech, _) = CannedSpeech::new(vec![
            Ok("the blue handle".to_string()),
            Ok("please pick three".to_string()),
        ]);
        let mut channel =
            InputChannel::new(InputMode::Voice, console).with_speech(Box::new(speech));

        assert_eq!(channel.get_choice("Pick:", Some(5)).unwrap(), 3);
    }

    #[test]
    fn test_end_of_input_is_an_error() {
        let (console, _) = scripted(&[]);
        let mut channel = InputChannel::new(InputMode::Text, console);

        assert!(matches!(channel.get_input("Confirm:"), Err(InputError::Closed)));
    }
}
