//! Console stand-ins for the platform audio-cue and speech sinks.
//!
//! The real sinks live on the device; these print what would be played or
//! spoken so the pipeline can run end to end from a terminal.

use medcue_core::{AudioCueSink, PlaybackError, SpeechError, SpeechSink};

pub struct ConsoleCueSink;

impl AudioCueSink for ConsoleCueSink {
    fn play_cue(&self) -> Result<(), PlaybackError> {
        // BEL gives an audible cue on terminals that support it.
        println!("\u{7}[cue] alarm tone");
        Ok(())
    }
}

pub struct ConsoleSpeechSink;

impl SpeechSink for ConsoleSpeechSink {
    fn speak(&self, utterance_id: &str, message: &str) -> Result<(), SpeechError> {
        println!("[speak {utterance_id}] {message}");
        Ok(())
    }
}
