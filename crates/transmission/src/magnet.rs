//! Magnet URI helpers.

use crate::TransmissionError;

/// Extract the display name (`dn` parameter) from a magnet URI.
///
/// Rejects anything that is not a magnet link, so callers can validate user
/// input before handing it to the daemon.
pub fn magnet_display_name(uri: &str) -> Result<String, TransmissionError> {
  let parsed = url::Url::parse(uri).map_err(|e| TransmissionError::Magnet(e.to_string()))?;
  if parsed.scheme() != "magnet" {
    return Err(TransmissionError::Magnet(format!(
      "unexpected scheme {:?}",
      parsed.scheme()
    )));
  }

  parsed
    .query_pairs()
    .find(|(key, _)| key == "dn")
    .map(|(_, value)| value.into_owned())
    .ok_or_else(|| TransmissionError::Magnet("missing 'dn' query parameter".to_string()))
}
