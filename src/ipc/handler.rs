//! Method dispatch: maps transport calls onto [`AudioService`] operations.

use crate::audio::bit_depth::BitDepth;
use crate::audio::format::TargetFormat;
use crate::error::{PcmforgeError, Result};
use crate::ipc::protocol::{ErrorCode, MethodCall, MethodResponse, bytes_value};
use crate::ipc::server::MethodHandler;
use crate::service::AudioService;
use log::{debug, warn};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// Methods understood by [`AudioMethodHandler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    ConvertToWav,
    ConvertToM4a,
    GetAudioInfo,
    TrimAudio,
    GetWaveform,
    ConvertToWavBytes,
    ConvertToM4aBytes,
    GetAudioInfoBytes,
    TrimAudioBytes,
    GetWaveformBytes,
}

impl Method {
    pub const ALL: [Method; 10] = [
        Method::ConvertToWav,
        Method::ConvertToM4a,
        Method::GetAudioInfo,
        Method::TrimAudio,
        Method::GetWaveform,
        Method::ConvertToWavBytes,
        Method::ConvertToM4aBytes,
        Method::GetAudioInfoBytes,
        Method::TrimAudioBytes,
        Method::GetWaveformBytes,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Method::ConvertToWav => "convertToWav",
            Method::ConvertToM4a => "convertToM4a",
            Method::GetAudioInfo => "getAudioInfo",
            Method::TrimAudio => "trimAudio",
            Method::GetWaveform => "getWaveform",
            Method::ConvertToWavBytes => "convertToWavBytes",
            Method::ConvertToM4aBytes => "convertToM4aBytes",
            Method::GetAudioInfoBytes => "getAudioInfoBytes",
            Method::TrimAudioBytes => "trimAudioBytes",
            Method::GetWaveformBytes => "getWaveformBytes",
        }
    }

    /// Code reported when the operation itself fails.
    pub fn error_code(self) -> ErrorCode {
        match self {
            Method::ConvertToWav
            | Method::ConvertToM4a
            | Method::ConvertToWavBytes
            | Method::ConvertToM4aBytes => ErrorCode::ConversionError,
            Method::GetAudioInfo | Method::GetAudioInfoBytes => ErrorCode::InfoError,
            Method::TrimAudio | Method::TrimAudioBytes => ErrorCode::TrimError,
            Method::GetWaveform | Method::GetWaveformBytes => ErrorCode::WaveformError,
        }
    }
}

/// Runs every call on the blocking pool so the accept loop never stalls.
pub struct AudioMethodHandler {
    service: Arc<AudioService>,
}

impl AudioMethodHandler {
    pub fn new(service: AudioService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

#[async_trait::async_trait]
impl MethodHandler for AudioMethodHandler {
    async fn handle(&self, call: MethodCall) -> MethodResponse {
        let Some(method) = Method::from_name(&call.method) else {
            debug!("Unknown method: {}", call.method);
            return MethodResponse::NotImplemented;
        };

        let service = Arc::clone(&self.service);
        let outcome = tokio::task::spawn_blocking(move || dispatch(&service, method, &call)).await;

        match outcome {
            Ok(Ok(value)) => MethodResponse::Success { value },
            Ok(Err(err)) => {
                warn!("{} failed: {}", method.name(), err);
                error_response(method.error_code(), err)
            }
            Err(join_err) => {
                warn!("{} aborted: {}", method.name(), join_err);
                MethodResponse::error(method.error_code(), join_err.to_string())
            }
        }
    }
}

fn error_response(code: ErrorCode, err: PcmforgeError) -> MethodResponse {
    match err {
        PcmforgeError::InvalidArgument { message } => {
            MethodResponse::error(ErrorCode::InvalidArguments, message)
        }
        other => MethodResponse::error(code, other.to_string()),
    }
}

/// Validates the arguments of `call` and runs the operation.
pub fn dispatch(service: &AudioService, method: Method, call: &MethodCall) -> Result<Value> {
    match method {
        Method::ConvertToWav => {
            let (input, output) = paths(call, "inputPath and outputPath are required")?;
            let target = target_format(call)?;
            let written = service.convert_to_wav(Path::new(input), Path::new(output), target)?;
            Ok(path_value(&written))
        }
        Method::ConvertToM4a => {
            let (input, output) = paths(call, "inputPath and outputPath are required")?;
            let written = service.convert_to_container(Path::new(input), Path::new(output))?;
            Ok(path_value(&written))
        }
        Method::GetAudioInfo => {
            let path = required(call.str_arg("path"), "path is required")?;
            let info = service.get_audio_info(Path::new(path))?;
            to_value(&info)
        }
        Method::TrimAudio => {
            const MESSAGE: &str = "inputPath, outputPath, startMs and endMs are required";
            let (input, output) = paths(call, MESSAGE)?;
            let (start_ms, end_ms) = window(call, MESSAGE)?;
            let kind = service.output_kind(call.str_arg("outputFormat").unwrap_or("wav"))?;
            let written = service.trim_audio(
                Path::new(input),
                Path::new(output),
                start_ms,
                end_ms,
                &kind,
            )?;
            Ok(path_value(&written))
        }
        Method::GetWaveform => {
            const MESSAGE: &str = "path and numberOfSamples are required";
            let path = required(call.str_arg("path"), MESSAGE)?;
            let count = sample_count(call, MESSAGE)?;
            let waveform = service.get_waveform(Path::new(path), count)?;
            Ok(Value::from(waveform))
        }
        Method::ConvertToWavBytes => {
            let (data, hint) = payload(call, "inputData and formatHint are required")?;
            let target = target_format(call)?;
            let include_header = call.bool_arg("includeHeader").unwrap_or(true);
            let bytes = service.convert_to_wav_bytes(&data, hint, target, include_header)?;
            Ok(bytes_value(&bytes))
        }
        Method::ConvertToM4aBytes => {
            let (data, hint) = payload(call, "inputData and formatHint are required")?;
            let bytes = service.convert_to_container_bytes(&data, hint)?;
            Ok(bytes_value(&bytes))
        }
        Method::GetAudioInfoBytes => {
            let (data, hint) = payload(call, "inputData and formatHint are required")?;
            let info = service.get_audio_info_bytes(&data, hint)?;
            to_value(&info)
        }
        Method::TrimAudioBytes => {
            const MESSAGE: &str = "inputData, formatHint, startMs and endMs are required";
            let (data, hint) = payload(call, MESSAGE)?;
            let (start_ms, end_ms) = window(call, MESSAGE)?;
            let kind = service.output_kind(call.str_arg("outputFormat").unwrap_or("wav"))?;
            let bytes = service.trim_audio_bytes(&data, hint, start_ms, end_ms, &kind)?;
            Ok(bytes_value(&bytes))
        }
        Method::GetWaveformBytes => {
            const MESSAGE: &str = "inputData, formatHint and numberOfSamples are required";
            let (data, hint) = payload(call, MESSAGE)?;
            let count = sample_count(call, MESSAGE)?;
            let waveform = service.get_waveform_bytes(&data, hint, count)?;
            Ok(Value::from(waveform))
        }
    }
}

fn required<T>(value: Option<T>, message: &str) -> Result<T> {
    value.ok_or_else(|| PcmforgeError::invalid_argument(message))
}

fn paths<'a>(call: &'a MethodCall, message: &str) -> Result<(&'a str, &'a str)> {
    match (call.str_arg("inputPath"), call.str_arg("outputPath")) {
        (Some(input), Some(output)) => Ok((input, output)),
        _ => Err(PcmforgeError::invalid_argument(message)),
    }
}

fn window(call: &MethodCall, message: &str) -> Result<(i64, i64)> {
    match (call.int_arg("startMs"), call.int_arg("endMs")) {
        (Some(start), Some(end)) => Ok((start, end)),
        _ => Err(PcmforgeError::invalid_argument(message)),
    }
}

fn sample_count(call: &MethodCall, message: &str) -> Result<usize> {
    let count = required(call.int_arg("numberOfSamples"), message)?;
    usize::try_from(count).map_err(|_| {
        PcmforgeError::invalid_argument(format!(
            "numberOfSamples must not be negative (got {})",
            count
        ))
    })
}

fn payload<'a>(call: &'a MethodCall, message: &str) -> Result<(Vec<u8>, &'a str)> {
    let (Some(_), Some(hint)) = (call.str_arg("inputData"), call.str_arg("formatHint")) else {
        return Err(PcmforgeError::invalid_argument(message));
    };
    let data = call
        .bytes_arg_value("inputData")
        .ok_or_else(|| PcmforgeError::invalid_argument("inputData must be base64-encoded"))?;
    Ok((data, hint))
}

fn target_format(call: &MethodCall) -> Result<TargetFormat> {
    let mut target = TargetFormat::source();
    if let Some(rate) = call.int_arg("sampleRate") {
        target = target.with_sample_rate(to_u32("sampleRate", rate)?);
    }
    if let Some(channels) = call.int_arg("channels") {
        target = target.with_channels(to_u32("channels", channels)?);
    }
    if let Some(bits) = call.int_arg("bitDepth") {
        target = target.with_bit_depth(BitDepth::try_from(to_u32("bitDepth", bits)?)?);
    }
    Ok(target)
}

fn to_u32(name: &str, value: i64) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| PcmforgeError::unsupported(format!("{} {} is out of range", name, value)))
}

fn path_value(path: &Path) -> Value {
    Value::from(path.display().to_string())
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| PcmforgeError::IpcProtocol {
        message: format!("Failed to serialize result: {}", e),
    })
}
