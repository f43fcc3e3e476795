//! Device description XML extraction.

use serde::Deserialize;

use super::{DeviceDescription, Icon, Service};
use crate::error::ClientError;

#[derive(Debug, Deserialize)]
struct Root {
    device: DeviceXml,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeviceXml {
    device_type: String,
    #[serde(default)]
    friendly_name: String,
    #[serde(default)]
    manufacturer: String,
    #[serde(rename = "manufacturerURL", default)]
    manufacturer_url: String,
    #[serde(default)]
    model_name: String,
    #[serde(default)]
    model_number: String,
    #[serde(default)]
    model_description: String,
    #[serde(rename = "UDN")]
    udn: String,
    #[serde(default)]
    icon_list: IconListXml,
    service_list: ServiceListXml,
}

#[derive(Debug, Default, Deserialize)]
struct IconListXml {
    #[serde(default)]
    icon: Vec<IconXml>,
}

#[derive(Debug, Deserialize)]
struct IconXml {
    #[serde(default)]
    mimetype: String,
    #[serde(default)]
    width: String,
    #[serde(default)]
    height: String,
    #[serde(default)]
    depth: String,
    #[serde(default)]
    url: String,
}

#[derive(Debug, Default, Deserialize)]
struct ServiceListXml {
    #[serde(default)]
    service: Vec<ServiceXml>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceXml {
    #[serde(default)]
    service_type: String,
    #[serde(default)]
    service_id: String,
    #[serde(rename = "SCPDURL", default)]
    scpd_url: String,
    #[serde(rename = "controlURL", default)]
    control_url: String,
    #[serde(rename = "eventSubURL", default)]
    event_sub_url: String,
}

impl DeviceDescription {
    /// Extract a device description from its XML document.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MalformedDescription`] when the document is not
    /// well-formed XML or is missing `deviceType`, `UDN`, or the service
    /// list.
    pub fn from_xml(xml: &str) -> Result<Self, ClientError> {
        let root: Root = quick_xml::de::from_str(xml).map_err(|e| {
            ClientError::MalformedDescription(format!("device description: {e}"))
        })?;

        let device = root.device;
        Ok(Self {
            device_type: device.device_type,
            friendly_name: device.friendly_name,
            manufacturer: device.manufacturer,
            manufacturer_url: device.manufacturer_url,
            model_name: device.model_name,
            model_number: device.model_number,
            model_description: device.model_description,
            udn: device.udn,
            icons: device
                .icon_list
                .icon
                .into_iter()
                .map(|icon| Icon {
                    mimetype: icon.mimetype,
                    width: icon.width,
                    height: icon.height,
                    depth: icon.depth,
                    url: icon.url,
                })
                .collect(),
            services: device
                .service_list
                .service
                .into_iter()
                .map(|service| {
                    (
                        service.service_id,
                        Service {
                            service_type: service.service_type,
                            scpd_url: service.scpd_url,
                            control_url: service.control_url,
                            event_sub_url: service.event_sub_url,
                        },
                    )
                })
                .collect(),
        })
    }
}
