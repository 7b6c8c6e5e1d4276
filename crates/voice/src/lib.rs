pub mod client;
pub mod pipeline;

pub use client::{SttResult, VoiceClient};
pub use pipeline::{process_voice_request, process_voice_request_stream, VoiceEvent, VoicePipelineOptions, VoiceResult};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_event_serializes_with_type_tag() {
        let event = VoiceEvent::SttStart;
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "stt_start");
    }

    #[test]
    fn voice_result_serializes_transcription_and_response_text() {
        let result = VoiceResult {
            request_id: "r1".into(),
            transcription: "hello".into(),
            response_text: "hi there".into(),
            processing_time_ms: 300,
            stt_latency_ms: 100,
            orchestrator_latency_ms: 150,
            tts_latency_ms: 50,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["transcription"], "hello");
        assert_eq!(json["response_text"], "hi there");
    }
}
