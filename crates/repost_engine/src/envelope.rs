use serde::Deserialize;

/// Response wrapper shared by the scrape and rewrite services.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    /// Reference the service logged the failure under.
    pub tracking_id: Option<String>,
}

impl<T> Envelope<T> {
    /// The payload when the service reported success, otherwise its message.
    pub fn into_result(self) -> Result<T, String> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            (true, None) => Err("response reported success without data".to_string()),
            (false, _) => Err(self
                .error
                .unwrap_or_else(|| "service reported failure".to_string())),
        }
    }
}
