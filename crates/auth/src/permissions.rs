use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are modeled as opaque strings (e.g. "orders.place").
/// A special wildcard permission `"*"` grants everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

pub const ALL: Permission = Permission::from_static("*");

pub const CATALOG_MANAGE: Permission = Permission::from_static("catalog.manage");
pub const ORDERS_PLACE: Permission = Permission::from_static("orders.place");
pub const ORDERS_READ_OWN: Permission = Permission::from_static("orders.read_own");
pub const ORDERS_MANAGE: Permission = Permission::from_static("orders.manage");
pub const CUSTOMERS_SELF: Permission = Permission::from_static("customers.self");
pub const CUSTOMERS_MANAGE: Permission = Permission::from_static("customers.manage");
pub const INVOICES_READ_OWN: Permission = Permission::from_static("invoices.read_own");
pub const INVOICES_MANAGE: Permission = Permission::from_static("invoices.manage");
pub const SETTINGS_MANAGE: Permission = Permission::from_static("settings.manage");
pub const REPORTS_READ: Permission = Permission::from_static("reports.read");
pub const USERS_MANAGE: Permission = Permission::from_static("users.manage");
