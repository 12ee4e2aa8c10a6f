use ort::execution_providers::ExecutionProviderDispatch;

/// Execution providers tried before ONNX Runtime's built-in CPU provider.
///
/// BlazeFace is small enough that CPU inference keeps up with a webcam, so
/// an empty list on Linux is fine.
pub fn preferred_execution_providers() -> Vec<ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        Vec::new()
    }
}
