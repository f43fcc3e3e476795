//! GENA property-set parsing.

use std::collections::BTreeMap;

use xmltree::Element;

/// Parse a GENA NOTIFY body into a state-variable → value map.
///
/// The body is an `<e:propertyset>` holding `<e:property>` wrappers, each
/// containing one element named after the changed state variable. Returns
/// `None` when the body is not a parsable property set; the caller decides
/// how loudly to drop it.
pub(crate) fn parse_property_set(xml: &str) -> Option<BTreeMap<String, String>> {
    let root = Element::parse(xml.as_bytes()).ok()?;
    if root.name != "propertyset" {
        return None;
    }

    let mut properties = BTreeMap::new();
    for property in root
        .children
        .iter()
        .filter_map(|node| node.as_element())
        .filter(|element| element.name == "property")
    {
        for variable in property.children.iter().filter_map(|node| node.as_element()) {
            let value = variable
                .get_text()
                .map(|text| text.into_owned())
                .unwrap_or_default();
            properties.insert(variable.name.clone(), value);
        }
    }

    Some(properties)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_property() {
        let xml = r#"<?xml version="1.0"?>
<e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0">
  <e:property><Volume>20</Volume></e:property>
</e:propertyset>"#;

        let properties = parse_property_set(xml).unwrap();
        assert_eq!(properties.get("Volume").map(String::as_str), Some("20"));
        assert_eq!(properties.len(), 1);
    }

    #[test]
    fn test_parse_multiple_properties() {
        let xml = r#"<e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0">
  <e:property><Volume>20</Volume></e:property>
  <e:property><Mute>0</Mute></e:property>
</e:propertyset>"#;

        let properties = parse_property_set(xml).unwrap();
        assert_eq!(properties.get("Volume").map(String::as_str), Some("20"));
        assert_eq!(properties.get("Mute").map(String::as_str), Some("0"));
    }

    #[test]
    fn test_empty_variable_value() {
        let xml = r#"<e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0">
  <e:property><TransportStatus></TransportStatus></e:property>
</e:propertyset>"#;

        let properties = parse_property_set(xml).unwrap();
        assert_eq!(
            properties.get("TransportStatus").map(String::as_str),
            Some("")
        );
    }

    #[test]
    fn test_rejects_non_property_set() {
        assert!(parse_property_set("<somethingelse/>").is_none());
        assert!(parse_property_set("not xml").is_none());
    }
}
