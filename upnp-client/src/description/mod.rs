//! Description document models and their XML extractors.
//!
//! Two pure extractors, no I/O: [`DeviceDescription::from_xml`] for the
//! device description document and [`ServiceDescription::from_xml`] for a
//! service's SCPD document. Fetching and caching live in the client.

mod device;
mod scpd;

use std::collections::BTreeMap;

/// A parsed UPnP device description.
///
/// `device_type`, `udn` and the service list are mandatory in the source
/// document; every other field defaults to empty when absent. Immutable once
/// fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescription {
    pub device_type: String,
    pub friendly_name: String,
    pub manufacturer: String,
    pub manufacturer_url: String,
    pub model_name: String,
    pub model_number: String,
    pub model_description: String,
    /// Unique device name, the stable identity of the device
    pub udn: String,
    /// Icons in document order
    pub icons: Vec<Icon>,
    /// Declared services keyed by serviceId
    pub services: BTreeMap<String, Service>,
}

/// A device icon entry. Dimensions are kept as the strings the document
/// carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon {
    pub mimetype: String,
    pub width: String,
    pub height: String,
    pub depth: String,
    pub url: String,
}

/// One service declared by the device.
///
/// The three URLs are stored as written in the document and resolved against
/// the description URL when used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub service_type: String,
    /// Location of the service's SCPD document
    pub scpd_url: String,
    /// SOAP endpoint for action invocation
    pub control_url: String,
    /// GENA endpoint for event subscription
    pub event_sub_url: String,
}

/// A parsed SCPD document: the actions a service offers and the state
/// variables they reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescription {
    pub actions: BTreeMap<String, Action>,
    pub state_variables: BTreeMap<String, StateVariable>,
}

/// One action with its arguments partitioned by direction, in declaration
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub inputs: Vec<Argument>,
    pub outputs: Vec<Argument>,
}

/// One action argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub name: String,
    /// Name of the state variable carrying this argument's type information
    pub related_state_variable: String,
}

/// One state variable from the service state table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateVariable {
    pub data_type: String,
    /// Whether changes to this variable are delivered through eventing
    pub send_events: bool,
    pub allowed_values: Vec<String>,
    pub default_value: String,
}
