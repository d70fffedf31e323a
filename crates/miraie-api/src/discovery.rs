// Device discovery endpoints
//
// Homes → spaces → devices, with per-device details and status fetched
// by follow-up calls keyed by device id.

use secrecy::SecretString;
use serde_json::{Map, Value};

use crate::client::ApiClient;
use crate::error::Error;
use crate::models::{DeviceDetails, HomeRecord};

impl ApiClient {
    /// List the user's homes with their spaces and device references.
    pub async fn list_homes(&self, token: &SecretString) -> Result<Vec<HomeRecord>, Error> {
        self.get(self.endpoints().homes.clone(), token).await
    }

    /// Fetch hardware metadata for one device.
    ///
    /// The endpoint answers with a single-element array.
    pub async fn get_device_details(
        &self,
        token: &SecretString,
        device_id: &str,
    ) -> Result<DeviceDetails, Error> {
        let url = self.endpoints().device_details(device_id)?;
        let mut details: Vec<DeviceDetails> = self.get(url, token).await?;
        if details.is_empty() {
            return Err(Error::Deserialization {
                message: format!("no details returned for device {device_id}"),
                body: "[]".into(),
            });
        }
        Ok(details.swap_remove(0))
    }

    /// Fetch the full current status document for one device.
    ///
    /// Returned as a flat JSON object; interpretation is left to the caller.
    pub async fn get_device_status(
        &self,
        token: &SecretString,
        device_id: &str,
    ) -> Result<Map<String, Value>, Error> {
        let url = self.endpoints().device_status(device_id)?;
        self.get(url, token).await
    }
}
