//! Spoken input: scoped audio capture and transcription.
//!
//! Recording and transcription are delegated to external programs so any
//! recorder (`arecord`, `sox`, `ffmpeg`) and any speech-to-text tool can be
//! plugged in through configuration.

use std::io::{Read, Write};
use std::process::{Child, Command as ProcessCommand, Stdio};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;

use super::{Console, InputError};

/// One spoken utterance in, one transcript out.
pub trait SpeechCapture: Send {
    /// Record a single utterance and return its transcription.
    ///
    /// An empty string means no speech was detected.
    fn capture(&mut self, console: &mut Console) -> Result<String, InputError>;
}

/// Speech capture driven by a recorder command and a transcriber command.
#[derive(Debug, Clone)]
pub struct CommandSpeech {
    /// Shell command streaming audio to stdout
    record_command: String,

    /// Shell command printing the transcript of `{file}`
    transcribe_command: String,
}

impl CommandSpeech {
    /// Create a backend from the two shell commands.
    ///
    /// `{rate}` in the recorder command is replaced by `sample_rate`.
    pub fn new(
        record_command: impl Into<String>,
        transcribe_command: impl Into<String>,
        sample_rate: u32,
    ) -> Self {
        let record_command = record_command.into().replace("{rate}", &sample_rate.to_string());
        Self { record_command, transcribe_command: transcribe_command.into() }
    }

    /// Run the transcriber over captured audio.
    pub fn transcribe(&self, audio: &[u8]) -> Result<String, InputError> {
        let mut file = tempfile::Builder::new()
            .prefix("stepguide-")
            .suffix(".wav")
            .tempfile()
            .map_err(|e| InputError::Voice(format!("cannot create audio file: {e}")))?;
        file.write_all(audio)?;
        file.flush()?;

        let path = file.path().to_string_lossy().into_owned();
        let command = self.transcribe_command.replace("{file}", &path);

        tracing::debug!(command = command, bytes = audio.len(), "Transcribing audio");

        let output = shell(&command)
            .stdin(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| InputError::Voice(format!("cannot run transcriber: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(InputError::Voice(format!(
                "transcriber exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).split_whitespace().collect::<Vec<_>>().join(" "))
    }
}

impl SpeechCapture for CommandSpeech {
    fn capture(&mut self, console: &mut Console) -> Result<String, InputError> {
        writeln!(console, "Voice input selected. Press ENTER to start...")?;
        console.read_line()?;

        let audio = {
            let session = RecordingSession::start(&self.record_command)?;
            writeln!(console, "Recording... Press ENTER to stop.")?;
            console.read_line()?;
            session.finish()
        };

        if audio.is_empty() {
            return Ok(String::new());
        }

        self.transcribe(&audio)
    }
}

/// A running recorder whose output is collected in the background.
///
/// The recorder process is killed and reaped when the session is finished
/// or dropped, so the microphone is released on every exit path.
#[derive(Debug)]
pub struct RecordingSession {
    child: Option<Child>,
    reader: Option<JoinHandle<()>>,
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl RecordingSession {
    /// Spawn the recorder and start collecting its stdout.
    pub fn start(record_command: &str) -> Result<Self, InputError> {
        let mut cmd = shell(record_command);
        cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::null());

        // Own process group, so pipelines behind the shell are stopped too
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| InputError::Voice(format!("cannot start recorder: {e}")))?;

        let buffer = Arc::new(Mutex::new(Vec::new()));
        let reader = child.stdout.take().map(|mut stdout| {
            let sink = Arc::clone(&buffer);
            std::thread::spawn(move || {
                let mut chunk = [0_u8; 4096];
                loop {
                    match stdout.read(&mut chunk) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => sink.lock().extend_from_slice(&chunk[..n]),
                    }
                }
            })
        });

        tracing::debug!(command = record_command, "Recording started");
        Ok(Self { child: Some(child), reader, buffer })
    }

    /// Bytes captured so far.
    pub fn captured_len(&self) -> usize {
        self.buffer.lock().len()
    }

    /// Stop the recorder and return everything it produced.
    pub fn finish(mut self) -> Vec<u8> {
        self.stop();
        std::mem::take(&mut *self.buffer.lock())
    }

    fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            // Already exited is fine.
            kill_group(&child);
            let _ = child.kill();
            let _ = child.wait();
            tracing::debug!("Recording stopped");
        }
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Kill every process in the recorder's group, not just the shell.
#[cfg(unix)]
fn kill_group(child: &Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Ok(pid) = i32::try_from(child.id()) {
        // ESRCH when the group is already gone.
        let _ = killpg(Pid::from_raw(pid), Signal::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) {}

fn shell(command: &str) -> ProcessCommand {
    let (program, flag) = if cfg!(target_os = "windows") { ("cmd", "/C") } else { ("sh", "-c") };
    let mut cmd = ProcessCommand::new(program);
    cmd.arg(flag).arg(command);
    cmd
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    fn wait_for_bytes(session: &RecordingSession, expected: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while session.captured_len() < expected && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_recording_session_collects_output() {
        let session = RecordingSession::start("printf 'pcm-data' && exec sleep 30").unwrap();
        wait_for_bytes(&session, 8);

        let started = Instant::now();
        let audio = session.finish();

        assert_eq!(audio, b"pcm-data");
        // The recorder is killed, not waited out.
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_dropping_session_releases_recorder() {
        let started = Instant::now();
        {
            let session = RecordingSession::start("exec sleep 30").unwrap();
            assert_eq!(session.captured_len(), 0);
        }
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_finish_stops_recorder_pipeline() {
        // The shell cannot exec a pipeline, so the recorder runs as its grandchild.
        let session = RecordingSession::start("printf 'pcm' && sleep 30 | cat").unwrap();
        wait_for_bytes(&session, 3);

        let started = Instant::now();
        let audio = session.finish();

        assert_eq!(audio, b"pcm");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_dropping_session_stops_recorder_pipeline() {
        let started = Instant::now();
        {
            let session = RecordingSession::start("sleep 30 | cat").unwrap();
            std::thread::sleep(Duration::from_millis(100));
            assert_eq!(session.captured_len(), 0);
        }
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_transcribe_reads_command_stdout() {
        let speech = CommandSpeech::new("true", "cat {file}", 16000);
        let transcript = speech.transcribe(b"  yes\n  please ").unwrap();
        assert_eq!(transcript, "yes please");
    }

    #[test]
    fn test_transcriber_failure_is_voice_error() {
        let speech = CommandSpeech::new("true", "exit 3", 16000);
        assert!(matches!(speech.transcribe(b"x"), Err(InputError::Voice(_))));
    }

    #[test]
    fn test_sample_rate_placeholder() {
        let speech = CommandSpeech::new("arecord -r {rate} -", "cat {file}", 22050);
        assert_eq!(speech.record_command, "arecord -r 22050 -");
    }
}
