// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Access setting stored on a block.
///
/// `Private`, `Public` and `PublicEditable` are absolute and never depend on the ancestors of a
/// block. `Inherited` defers to the access which was resolved for the path a block was reached
/// through. When used as a resolved ("effective") value, `Inherited` means no ancestor on the
/// path carried an absolute setting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    /// Only visible to users the block was directly shared with.
    Private,

    /// Visible to everyone.
    Public,

    /// Visible to and editable by everyone.
    PublicEditable,

    /// Defers to the ancestors of the block.
    #[default]
    Inherited,
}

impl AccessType {
    /// Returns `true` if this setting does not depend on the ancestors of a block.
    pub fn is_absolute(&self) -> bool {
        !matches!(self, AccessType::Inherited)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessType::Private => "private",
            AccessType::Public => "public",
            AccessType::PublicEditable => "public_editable",
            AccessType::Inherited => "inherited",
        }
    }
}

impl Display for AccessType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AccessType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(AccessType::Private),
            "public" => Ok(AccessType::Public),
            // Older databases stored the shortened form.
            "public_editable" | "public_ed" => Ok(AccessType::PublicEditable),
            "inherited" => Ok(AccessType::Inherited),
            other => Err(ParseError::AccessType(other.to_string())),
        }
    }
}

/// Arrangement of the children of a block when rendered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    #[default]
    Default,
    Horizontal,
    Vertical,
    Table,
}

impl Layout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layout::Default => "default",
            Layout::Horizontal => "horizontal",
            Layout::Vertical => "vertical",
            Layout::Table => "table",
        }
    }
}

impl Display for Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Layout {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Layout::Default),
            "horizontal" => Ok(Layout::Horizontal),
            "vertical" => Ok(Layout::Vertical),
            "table" => Ok(Layout::Table),
            other => Err(ParseError::Layout(other.to_string())),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown access type '{0}'")]
    AccessType(String),

    #[error("unknown layout '{0}'")]
    Layout(String),
}
