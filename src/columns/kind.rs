//! Column type descriptors.
//!
//! A column holds either a scalar, a sequence of scalars, or a sequence of
//! sequences of scalars. The set of element kinds is closed, so every
//! [`ColumnType`] has an allocation and a release case.

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Element kinds a column can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    /// 8-bit unsigned integer
    UChar,
    /// 16-bit signed integer
    Short,
    /// 16-bit unsigned integer
    UShort,
    /// 32-bit signed integer
    Int,
    /// 32-bit unsigned integer
    UInt,
    /// 32-bit floating point
    Float,
    /// 64-bit floating point
    Double,
    /// 64-bit signed integer
    Long,
    /// 64-bit unsigned integer
    ULong,
    /// Boolean value
    Bool,
}

impl ScalarKind {
    pub const ALL: [ScalarKind; 10] = [
        ScalarKind::UChar,
        ScalarKind::Short,
        ScalarKind::UShort,
        ScalarKind::Int,
        ScalarKind::UInt,
        ScalarKind::Float,
        ScalarKind::Double,
        ScalarKind::Long,
        ScalarKind::ULong,
        ScalarKind::Bool,
    ];

    /// One-letter code used as the tag of scalar columns.
    pub fn code(&self) -> &'static str {
        match self {
            ScalarKind::UChar => "h",
            ScalarKind::Short => "s",
            ScalarKind::UShort => "t",
            ScalarKind::Int => "i",
            ScalarKind::UInt => "j",
            ScalarKind::Float => "f",
            ScalarKind::Double => "d",
            ScalarKind::Long => "x",
            ScalarKind::ULong => "y",
            ScalarKind::Bool => "b",
        }
    }

    /// Element name used inside sequence tags.
    pub fn element_name(&self) -> &'static str {
        match self {
            ScalarKind::UChar => "unsigned char",
            ScalarKind::Short => "short",
            ScalarKind::UShort => "unsigned short",
            ScalarKind::Int => "int",
            ScalarKind::UInt => "unsigned int",
            ScalarKind::Float => "float",
            ScalarKind::Double => "double",
            ScalarKind::Long => "long",
            ScalarKind::ULong => "unsigned long",
            ScalarKind::Bool => "bool",
        }
    }

    /// Resolve a scalar name. Accepts one-letter codes, element names,
    /// `*_t` storage aliases and Rust primitive names.
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name {
            "h" | "unsigned char" | "UChar_t" | "u8" => ScalarKind::UChar,
            "s" | "short" | "Short_t" | "i16" => ScalarKind::Short,
            "t" | "unsigned short" | "UShort_t" | "u16" => ScalarKind::UShort,
            "i" | "int" | "Int_t" | "i32" => ScalarKind::Int,
            "j" | "unsigned int" | "UInt_t" | "u32" => ScalarKind::UInt,
            "f" | "float" | "Float_t" | "f32" => ScalarKind::Float,
            "d" | "double" | "Double_t" | "f64" => ScalarKind::Double,
            "x" | "long" | "Long64_t" | "i64" => ScalarKind::Long,
            "y" | "unsigned long" | "ULong64_t" | "u64" => ScalarKind::ULong,
            "b" | "bool" | "Bool_t" => ScalarKind::Bool,
            _ => return None,
        };
        Some(kind)
    }
}

/// Nesting level of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Depth {
    Scalar,
    Seq,
    Nested,
}

impl Depth {
    pub const ALL: [Depth; 3] = [Depth::Scalar, Depth::Seq, Depth::Nested];
}

/// Full type of a column: nesting level plus element kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnType {
    pub depth: Depth,
    pub kind: ScalarKind,
}

impl ColumnType {
    pub const fn new(depth: Depth, kind: ScalarKind) -> Self {
        Self { depth, kind }
    }

    pub const fn scalar(kind: ScalarKind) -> Self {
        Self::new(Depth::Scalar, kind)
    }

    pub const fn seq(kind: ScalarKind) -> Self {
        Self::new(Depth::Seq, kind)
    }

    pub const fn nested(kind: ScalarKind) -> Self {
        Self::new(Depth::Nested, kind)
    }

    /// Every supported column type.
    pub fn all() -> impl Iterator<Item = ColumnType> {
        Depth::ALL.into_iter().flat_map(|depth| {
            ScalarKind::ALL
                .into_iter()
                .map(move |kind| ColumnType::new(depth, kind))
        })
    }

    /// Compact tag, e.g. `f`, `vector<float>`, `vector<vector<float> >`.
    pub fn tag(&self) -> String {
        match self.depth {
            Depth::Scalar => self.kind.code().to_string(),
            Depth::Seq => format!("vector<{}>", self.kind.element_name()),
            Depth::Nested => format!("vector<vector<{}> >", self.kind.element_name()),
        }
    }

    /// Parse a runtime type descriptor.
    ///
    /// `vector<...>` and `sequence<...>` wrappers may nest at most twice;
    /// anything else is [`AnalysisError::BindingTypeUnsupported`].
    pub fn parse(descriptor: &str) -> Result<Self> {
        let unsupported = || AnalysisError::BindingTypeUnsupported(descriptor.to_string());

        let mut rest = descriptor.trim();
        let mut levels = 0usize;
        while let Some(inner) = rest
            .strip_prefix("vector<")
            .or_else(|| rest.strip_prefix("sequence<"))
        {
            rest = inner
                .trim_end()
                .strip_suffix('>')
                .ok_or_else(unsupported)?
                .trim();
            levels += 1;
        }

        let kind = ScalarKind::from_name(rest).ok_or_else(unsupported)?;
        let depth = match levels {
            0 => Depth::Scalar,
            1 => Depth::Seq,
            2 => Depth::Nested,
            _ => return Err(unsupported()),
        };
        Ok(ColumnType::new(depth, kind))
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}
