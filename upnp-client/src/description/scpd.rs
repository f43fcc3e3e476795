//! SCPD (service description) XML extraction.

use serde::Deserialize;

use super::{Action, Argument, ServiceDescription, StateVariable};
use crate::error::ClientError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScpdXml {
    #[serde(default)]
    action_list: ActionListXml,
    #[serde(default)]
    service_state_table: StateTableXml,
}

#[derive(Debug, Default, Deserialize)]
struct ActionListXml {
    #[serde(default)]
    action: Vec<ActionXml>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActionXml {
    name: String,
    #[serde(default)]
    argument_list: ArgumentListXml,
}

#[derive(Debug, Default, Deserialize)]
struct ArgumentListXml {
    #[serde(default)]
    argument: Vec<ArgumentXml>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArgumentXml {
    #[serde(default)]
    name: String,
    #[serde(default)]
    direction: String,
    #[serde(default)]
    related_state_variable: String,
}

#[derive(Debug, Default, Deserialize)]
struct StateTableXml {
    #[serde(rename = "stateVariable", default)]
    state_variable: Vec<StateVariableXml>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StateVariableXml {
    // sendEvents defaults to "yes" in the UPnP device architecture
    #[serde(rename = "@sendEvents", default = "default_send_events")]
    send_events: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    data_type: String,
    #[serde(default)]
    default_value: String,
    #[serde(default)]
    allowed_value_list: AllowedValueListXml,
}

fn default_send_events() -> String {
    "yes".to_string()
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AllowedValueListXml {
    #[serde(default)]
    allowed_value: Vec<String>,
}

impl ServiceDescription {
    /// Extract a service description from its SCPD document.
    ///
    /// Arguments keep their declaration order and are partitioned into
    /// inputs and outputs by their `<direction>` element.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MalformedDescription`] when the document is not
    /// well-formed XML or an action is missing its name.
    pub fn from_xml(xml: &str) -> Result<Self, ClientError> {
        let scpd: ScpdXml = quick_xml::de::from_str(xml)
            .map_err(|e| ClientError::MalformedDescription(format!("SCPD: {e}")))?;

        let actions = scpd
            .action_list
            .action
            .into_iter()
            .map(|action| {
                let mut inputs = Vec::new();
                let mut outputs = Vec::new();
                for argument in action.argument_list.argument {
                    let parsed = Argument {
                        name: argument.name,
                        related_state_variable: argument.related_state_variable,
                    };
                    if argument.direction.eq_ignore_ascii_case("in") {
                        inputs.push(parsed);
                    } else {
                        outputs.push(parsed);
                    }
                }
                (action.name, Action { inputs, outputs })
            })
            .collect();

        let state_variables = scpd
            .service_state_table
            .state_variable
            .into_iter()
            .map(|variable| {
                (
                    variable.name,
                    StateVariable {
                        data_type: variable.data_type,
                        send_events: variable.send_events.eq_ignore_ascii_case("yes"),
                        allowed_values: variable.allowed_value_list.allowed_value,
                        default_value: variable.default_value,
                    },
                )
            })
            .collect();

        Ok(Self {
            actions,
            state_variables,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCPD_XML: &str = r#"<?xml version="1.0"?>
<scpd xmlns="urn:schemas-upnp-org:service-1-0">
  <specVersion><major>1</major><minor>0</minor></specVersion>
  <actionList>
    <action>
      <name>GetVolume</name>
      <argumentList>
        <argument>
          <name>Channel</name>
          <direction>in</direction>
          <relatedStateVariable>A_ARG_TYPE_Channel</relatedStateVariable>
        </argument>
        <argument>
          <name>CurrentVolume</name>
          <direction>out</direction>
          <relatedStateVariable>Volume</relatedStateVariable>
        </argument>
      </argumentList>
    </action>
    <action>
      <name>SetVolume</name>
      <argumentList>
        <argument>
          <name>Channel</name>
          <direction>in</direction>
          <relatedStateVariable>A_ARG_TYPE_Channel</relatedStateVariable>
        </argument>
        <argument>
          <name>DesiredVolume</name>
          <direction>in</direction>
          <relatedStateVariable>Volume</relatedStateVariable>
        </argument>
      </argumentList>
    </action>
  </actionList>
  <serviceStateTable>
    <stateVariable sendEvents="yes">
      <name>Volume</name>
      <dataType>ui2</dataType>
      <defaultValue>0</defaultValue>
    </stateVariable>
    <stateVariable sendEvents="no">
      <name>A_ARG_TYPE_Channel</name>
      <dataType>string</dataType>
      <allowedValueList>
        <allowedValue>Master</allowedValue>
        <allowedValue>LF</allowedValue>
        <allowedValue>RF</allowedValue>
      </allowedValueList>
    </stateVariable>
  </serviceStateTable>
</scpd>"#;

    #[test]
    fn test_parse_actions_and_variables() {
        let description = ServiceDescription::from_xml(SCPD_XML).unwrap();

        let get_volume = description.actions.get("GetVolume").unwrap();
        assert_eq!(get_volume.inputs.len(), 1);
        assert_eq!(get_volume.inputs[0].name, "Channel");
        assert_eq!(get_volume.outputs.len(), 1);
        assert_eq!(get_volume.outputs[0].name, "CurrentVolume");
        assert_eq!(get_volume.outputs[0].related_state_variable, "Volume");

        let set_volume = description.actions.get("SetVolume").unwrap();
        assert_eq!(set_volume.inputs.len(), 2);
        assert_eq!(set_volume.inputs[1].name, "DesiredVolume");
        assert!(set_volume.outputs.is_empty());

        let volume = description.state_variables.get("Volume").unwrap();
        assert!(volume.send_events);
        assert_eq!(volume.data_type, "ui2");
        assert_eq!(volume.default_value, "0");
        assert!(volume.allowed_values.is_empty());

        let channel = description.state_variables.get("A_ARG_TYPE_Channel").unwrap();
        assert!(!channel.send_events);
        assert_eq!(channel.allowed_values, vec!["Master", "LF", "RF"]);
    }

    #[test]
    fn test_related_state_variables_resolve() {
        let description = ServiceDescription::from_xml(SCPD_XML).unwrap();

        for action in description.actions.values() {
            for argument in action.inputs.iter().chain(&action.outputs) {
                assert!(
                    description
                        .state_variables
                        .contains_key(&argument.related_state_variable),
                    "dangling relatedStateVariable {}",
                    argument.related_state_variable
                );
            }
        }
    }

    #[test]
    fn test_send_events_defaults_to_yes() {
        let xml = r#"<scpd>
  <serviceStateTable>
    <stateVariable>
      <name>Status</name>
      <dataType>boolean</dataType>
    </stateVariable>
  </serviceStateTable>
</scpd>"#;

        let description = ServiceDescription::from_xml(xml).unwrap();
        assert!(description.state_variables.get("Status").unwrap().send_events);
    }

    #[test]
    fn test_empty_scpd() {
        let description = ServiceDescription::from_xml("<scpd></scpd>").unwrap();
        assert!(description.actions.is_empty());
        assert!(description.state_variables.is_empty());
    }

    #[test]
    fn test_unparsable_scpd() {
        assert!(ServiceDescription::from_xml("<scpd>").is_err());
    }
}
