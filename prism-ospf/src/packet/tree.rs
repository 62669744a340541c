//
// Copyright (c) The Prism Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::{Ipv4Addr, Ipv6Addr};

use bytes::Bytes;
use enum_as_inner::EnumAsInner;
use ipnetwork::IpNetwork;
use prism_utils::bytes::ByteRegion;
use serde::{Deserialize, Serialize};

use crate::packet::error::{Anomaly, Diagnostic, Severity};

// Typed value of a decoded field.
#[derive(Clone, Debug, EnumAsInner, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum FieldValue {
    // Subtree with no scalar value of its own.
    Container,
    Uint(u64),
    Flags(u32),
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    Prefix(IpNetwork),
    Float(f32),
    Str(String),
    Raw(Bytes),
}

// A decoded leaf or subtree.
//
// Fields own their children; there are no references back into the tree or
// into the decoder. The region always indexes the original input buffer.
#[derive(Clone, Debug, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct Field {
    pub name: String,
    pub region: ByteRegion,
    pub value: FieldValue,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Field>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

// ===== impl Field =====

impl Field {
    fn new(
        name: impl Into<String>,
        region: ByteRegion,
        value: FieldValue,
    ) -> Field {
        Field {
            name: name.into(),
            region,
            value,
            children: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn container(name: impl Into<String>, region: ByteRegion) -> Field {
        Field::new(name, region, FieldValue::Container)
    }

    pub fn uint(
        name: impl Into<String>,
        region: ByteRegion,
        value: impl Into<u64>,
    ) -> Field {
        Field::new(name, region, FieldValue::Uint(value.into()))
    }

    pub fn flags(
        name: impl Into<String>,
        region: ByteRegion,
        bits: impl Into<u32>,
    ) -> Field {
        Field::new(name, region, FieldValue::Flags(bits.into()))
    }

    pub fn ipv4(
        name: impl Into<String>,
        region: ByteRegion,
        addr: Ipv4Addr,
    ) -> Field {
        Field::new(name, region, FieldValue::Ipv4(addr))
    }

    pub fn ipv6(
        name: impl Into<String>,
        region: ByteRegion,
        addr: Ipv6Addr,
    ) -> Field {
        Field::new(name, region, FieldValue::Ipv6(addr))
    }

    pub fn prefix(
        name: impl Into<String>,
        region: ByteRegion,
        prefix: IpNetwork,
    ) -> Field {
        Field::new(name, region, FieldValue::Prefix(prefix))
    }

    pub fn float(
        name: impl Into<String>,
        region: ByteRegion,
        value: f32,
    ) -> Field {
        Field::new(name, region, FieldValue::Float(value))
    }

    pub fn str(
        name: impl Into<String>,
        region: ByteRegion,
        value: impl Into<String>,
    ) -> Field {
        Field::new(name, region, FieldValue::Str(value.into()))
    }

    pub fn raw(
        name: impl Into<String>,
        region: ByteRegion,
        value: Bytes,
    ) -> Field {
        Field::new(name, region, FieldValue::Raw(value))
    }

    // Appends a child field.
    pub fn push(&mut self, field: Field) {
        self.children.push(field);
    }

    // Records an anomaly on this field.
    pub fn record(&mut self, region: ByteRegion, anomaly: Anomaly) {
        let diagnostic = Diagnostic::new(region, anomaly);
        tracing::debug!(field = %self.name, %diagnostic, "decode anomaly");
        self.diagnostics.push(diagnostic);
    }

    /// Returns the first direct child with the given name.
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.children.iter().find(|field| field.name == name)
    }

    /// Returns all direct children with the given name.
    pub fn fields<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Field> + 'a {
        self.children.iter().filter(move |field| field.name == name)
    }

    /// Walks a path of child names from this field.
    pub fn lookup(&self, path: &[&str]) -> Option<&Field> {
        let mut field = self;
        for name in path {
            field = field.get(name)?;
        }
        Some(field)
    }

    /// Visits this field and all descendants, depth-first.
    pub fn walk(&self, visit: &mut impl FnMut(&Field)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// Collects the diagnostics attached to this field and all descendants.
    pub fn all_diagnostics(&self) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        self.walk(&mut |field| {
            diagnostics.extend(field.diagnostics.iter().cloned())
        });
        diagnostics
    }

    /// Returns the highest severity recorded anywhere in this subtree.
    pub fn max_severity(&self) -> Option<Severity> {
        let mut max = None;
        self.walk(&mut |field| {
            for diagnostic in &field.diagnostics {
                if max < Some(diagnostic.severity) {
                    max = Some(diagnostic.severity);
                }
            }
        });
        max
    }
}

// ===== unit tests =====
