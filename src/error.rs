/// Contract violations between the canvas model and its views.
///
/// Neither is recoverable at the call site; the offending operation is abandoned and the raster is
/// left as it was.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CanvasError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
}
