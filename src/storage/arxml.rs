//! Line-oriented reader for AUTOSAR ECU configuration (ARXML) files.
//!
//! Only parameter values are extracted: a line holding a `DEFINITION-REF`
//! followed directly by a line holding a `<VALUE>`. The definition path names
//! the parameter; everything up to and including the `EcucDefs` package is
//! dropped, so `/AUTOSAR/EcucDefs/Can/CanGeneral/CanTimeoutDuration` becomes
//! `Can.CanGeneral.CanTimeoutDuration`.

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use crate::domain::{ConfigTree, RawValue, TreeBuilder};

static DEFINITION_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<DEFINITION-REF[^>]*>\s*([^<]*?)\s*</DEFINITION-REF>")
        .expect("definition pattern is a valid regex")
});

static VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<VALUE>([^<]*)</VALUE>").expect("value pattern is a valid regex")
});

/// Builds a tree from ARXML content.
///
/// Containers along a definition path are shared, and each parameter value
/// becomes a new leaf, so a parameter configured in several container
/// instances shows up as same-named siblings.
pub fn parse(source: impl Into<String>, content: &str) -> ConfigTree {
    let mut builder = ConfigTree::builder(source);
    let mut definition: Option<&str> = None;

    for line in content.lines() {
        if let Some(captures) = DEFINITION_REF.captures(line) {
            if let Some(previous) = definition.replace(captures.get(1).map_or("", |m| m.as_str())) {
                trace!("{previous} has no value, skipped");
            }
            continue;
        }

        let Some(path) = definition.take() else {
            continue;
        };
        match VALUE.captures(line) {
            Some(value) => insert(&mut builder, path, value[1].trim()),
            None => trace!("{path} has no value, skipped"),
        }
    }

    builder.build()
}

fn insert(builder: &mut TreeBuilder, definition: &str, value: &str) {
    let segments: Vec<&str> = definition.split('/').filter(|s| !s.is_empty()).collect();
    let start = segments
        .iter()
        .position(|segment| *segment == "EcucDefs")
        .map_or(0, |index| index + 1);

    let Some((name, containers)) = segments[start..].split_last() else {
        trace!("{definition} names no parameter, skipped");
        return;
    };

    let mut parent = builder.root();
    for container in containers {
        parent = builder.ensure_child(parent, container);
    }
    builder.add_child(parent, *name, Some(RawValue::scalar(value)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{CrossFilePolicy, ParameterAddress},
        engine::resolve_in_order,
    };

    const ARXML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<AUTOSAR>
  <ECUC-CONTAINER-VALUE>
    <DEFINITION-REF DEST="ECUC-PARAM-CONF-CONTAINER-DEF">/AUTOSAR/EcucDefs/Can/CanGeneral</DEFINITION-REF>
    <PARAMETER-VALUES>
      <ECUC-NUMERICAL-PARAM-VALUE>
        <DEFINITION-REF DEST="ECUC-FLOAT-PARAM-DEF">/AUTOSAR/EcucDefs/Can/CanGeneral/CanTimeoutDuration</DEFINITION-REF>
        <VALUE>0.001</VALUE>
      </ECUC-NUMERICAL-PARAM-VALUE>
      <ECUC-TEXTUAL-PARAM-VALUE>
        <DEFINITION-REF DEST="ECUC-ENUMERATION-PARAM-DEF">/AUTOSAR/EcucDefs/Can/CanGeneral/CanDevErrorDetect</DEFINITION-REF>
        <VALUE>STD_ON</VALUE>
      </ECUC-TEXTUAL-PARAM-VALUE>
    </PARAMETER-VALUES>
  </ECUC-CONTAINER-VALUE>
  <ECUC-CONTAINER-VALUE>
    <DEFINITION-REF DEST="ECUC-PARAM-CONF-CONTAINER-DEF">/AUTOSAR/EcucDefs/Can/CanController</DEFINITION-REF>
    <PARAMETER-VALUES>
      <ECUC-NUMERICAL-PARAM-VALUE>
        <DEFINITION-REF DEST="ECUC-INTEGER-PARAM-DEF">/AUTOSAR/EcucDefs/Can/CanController/CanControllerBaudRate</DEFINITION-REF>
        <VALUE>500</VALUE>
      </ECUC-NUMERICAL-PARAM-VALUE>
    </PARAMETER-VALUES>
  </ECUC-CONTAINER-VALUE>
  <ECUC-CONTAINER-VALUE>
    <DEFINITION-REF DEST="ECUC-PARAM-CONF-CONTAINER-DEF">/AUTOSAR/EcucDefs/Can/CanController</DEFINITION-REF>
    <PARAMETER-VALUES>
      <ECUC-NUMERICAL-PARAM-VALUE>
        <DEFINITION-REF DEST="ECUC-INTEGER-PARAM-DEF">/AUTOSAR/EcucDefs/Can/CanController/CanControllerBaudRate</DEFINITION-REF>
        <VALUE>250</VALUE>
      </ECUC-NUMERICAL-PARAM-VALUE>
      <ECUC-REFERENCE-VALUE>
        <DEFINITION-REF DEST="ECUC-REFERENCE-DEF">/AUTOSAR/EcucDefs/Can/CanController/CanCpuClockRef</DEFINITION-REF>
        <VALUE-REF DEST="ECUC-CONTAINER-VALUE">/Mcu/McuClock</VALUE-REF>
      </ECUC-REFERENCE-VALUE>
    </PARAMETER-VALUES>
  </ECUC-CONTAINER-VALUE>
</AUTOSAR>
"#;

    fn values(tree: &ConfigTree, address: &str) -> Vec<String> {
        let address: ParameterAddress = address.parse().unwrap();
        resolve_in_order(std::slice::from_ref(tree), &address, CrossFilePolicy::FirstMatch)
            .into_iter()
            .filter_map(|node| node.value().map(ToString::to_string))
            .collect()
    }

    #[test]
    fn extracts_parameter_values() {
        let tree = parse("Can.arxml", ARXML);

        assert_eq!(tree.source(), "Can.arxml");
        assert_eq!(values(&tree, "Can.CanGeneral.CanTimeoutDuration"), vec!["0.001"]);
        assert_eq!(values(&tree, "**.CanDevErrorDetect"), vec!["STD_ON"]);
    }

    #[test]
    fn repeated_parameters_become_siblings() {
        let tree = parse("Can.arxml", ARXML);
        assert_eq!(
            values(&tree, "Can.CanController.CanControllerBaudRate"),
            vec!["500", "250"]
        );
        assert_eq!(tree.root().child("Can").unwrap().children().count(), 2);
    }

    #[test]
    fn references_are_not_values() {
        let tree = parse("Can.arxml", ARXML);
        assert!(values(&tree, "**.CanCpuClockRef").is_empty());
    }

    #[test]
    fn paths_without_ecuc_defs_are_kept_whole() {
        let tree = parse(
            "Vendor.arxml",
            "<DEFINITION-REF>/Vendor/Module/Param</DEFINITION-REF>\n<VALUE>1</VALUE>\n",
        );
        assert_eq!(values(&tree, "Vendor.Module.Param"), vec!["1"]);
    }

    #[test]
    fn empty_content_gives_empty_tree() {
        assert!(parse("Empty.arxml", "").is_empty());
    }
}
