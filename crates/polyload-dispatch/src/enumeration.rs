//! Enum constants as callers

use std::collections::BTreeMap;

use crate::caller::Caller;

/// Constants of a loaded enum type, keyed case-insensitively by name
#[derive(Clone, Debug, Default)]
pub struct EnumTable {
    type_name: String,
    constants: BTreeMap<String, Caller>,
    order: Vec<String>,
}

impl EnumTable {
    pub(crate) fn new(type_name: impl Into<String>) -> Self {
        EnumTable {
            type_name: type_name.into(),
            constants: BTreeMap::new(),
            order: Vec::new(),
        }
    }

    pub(crate) fn insert(&mut self, name: &str, caller: Caller) {
        let key = name.to_lowercase();
        if self.constants.insert(key, caller).is_none() {
            self.order.push(name.to_string());
        }
    }

    /// Qualified name of the enum type
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn get(&self, name: &str) -> Option<&Caller> {
        self.constants.get(&name.to_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constants.contains_key(&name.to_lowercase())
    }

    /// Constant names in declaration order
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// Constants in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Caller)> {
        self.order.iter().filter_map(move |name| {
            self.constants
                .get(&name.to_lowercase())
                .map(|caller| (name.as_str(), caller))
        })
    }

    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyload_artifact::Artifact;
    use polyload_core::{TypeDef, Value};

    #[test]
    fn test_case_insensitive_lookup_keeps_order() {
        let ty = TypeDef::enumeration("net::Protocol", &["Tcp", "Udp"]).build();
        let mut table = EnumTable::new(ty.name());
        for constant in ty.constants() {
            let name = constant.downcast::<polyload_core::EnumConstant>().unwrap().name.clone();
            table.insert(&name, Caller::wrap(Value::Object(constant), Artifact::unknown(), None));
        }

        assert_eq!(table.len(), 2);
        assert!(table.contains("TCP"));
        assert_eq!(table.get("udp").unwrap().call("ordinal").unwrap().as_long(), 1);
        assert_eq!(table.names(), ["Tcp", "Udp"]);
        assert_eq!(table.iter().map(|(n, _)| n).collect::<Vec<_>>(), vec!["Tcp", "Udp"]);
        assert!(table.get("sctp").is_none());
    }
}
