//! Language-neutral method and member descriptors, and the catalog translators
//! resolve them against when they are constructed.

use std::collections::HashSet;
use std::fmt;

use crate::error::{ProviderError, Result};
use crate::metadata::ClrType;

/// Parameter type of a signature; nullability distinguishes overloads.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParamType {
    pub clr_type: ClrType,
    pub nullable: bool,
}

impl ParamType {
    pub fn of(clr_type: ClrType) -> Self {
        Self {
            clr_type,
            nullable: false,
        }
    }

    pub fn nullable(clr_type: ClrType) -> Self {
        Self {
            clr_type,
            nullable: true,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable {
            write!(f, "{}?", self.clr_type)
        } else {
            write!(f, "{}", self.clr_type)
        }
    }
}

/// Method identified by declaring type, name and parameter types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSignature {
    pub declaring_type: String,
    pub name: String,
    pub parameters: Vec<ParamType>,
    pub return_type: ClrType,
}

impl MethodSignature {
    pub fn new(declaring_type: &str, name: &str, parameters: Vec<ParamType>, return_type: ClrType) -> Self {
        Self {
            declaring_type: declaring_type.to_string(),
            name: name.to_string(),
            parameters,
            return_type,
        }
    }

    /// Same declaring type, name and parameters. Return types are not part of
    /// overload identity.
    pub fn matches(&self, other: &MethodSignature) -> bool {
        self.declaring_type == other.declaring_type
            && self.name == other.name
            && self.parameters == other.parameters
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}(", self.declaring_type, self.name)?;
        for (i, p) in self.parameters.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", p)?;
        }
        f.write_str(")")
    }
}

/// Property or field identified by declaring type and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberSignature {
    pub declaring_type: String,
    pub name: String,
}

impl MemberSignature {
    pub fn new(declaring_type: &str, name: &str) -> Self {
        Self {
            declaring_type: declaring_type.to_string(),
            name: name.to_string(),
        }
    }
}

/// Declaring type of the provider's database functions.
pub const DB_FUNCTIONS: &str = "DbFunctions";

/// Date-part units accepted by the date-difference functions, with the
/// DATEDIFF unit each maps to.
pub const DATE_DIFF_UNITS: [(&str, &str); 9] = [
    ("Year", "YEAR"),
    ("Month", "MONTH"),
    ("Day", "DAY"),
    ("Hour", "HOUR"),
    ("Minute", "MINUTE"),
    ("Second", "SECOND"),
    ("Millisecond", "MILLISECOND"),
    ("Microsecond", "MICROSECOND"),
    ("Nanosecond", "NANOSECOND"),
];

/// Units whose difference functions also accept durations.
pub fn accepts_time_span(unit: &str) -> bool {
    !matches!(unit, "Year" | "Month" | "Day")
}

/// Methods known to the host.
///
/// Translators look up every signature they handle when they are built, so a
/// host that does not expose one fails at startup instead of silently never
/// translating it.
#[derive(Debug, Clone, Default)]
pub struct MethodCatalog {
    methods: Vec<MethodSignature>,
    members: HashSet<MemberSignature>,
}

impl MethodCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_method(&mut self, signature: MethodSignature) -> &mut Self {
        if !self.methods.iter().any(|m| m.matches(&signature)) {
            self.methods.push(signature);
        }
        self
    }

    pub fn add_member(&mut self, signature: MemberSignature) -> &mut Self {
        self.members.insert(signature);
        self
    }

    pub fn len(&self) -> usize {
        self.methods.len() + self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty() && self.members.is_empty()
    }

    /// Catalog entry matching `declaring_type.name(parameters)`.
    pub fn resolve(&self, declaring_type: &str, name: &str, parameters: &[ParamType]) -> Result<MethodSignature> {
        self.methods
            .iter()
            .find(|m| m.declaring_type == declaring_type && m.name == name && m.parameters == parameters)
            .cloned()
            .ok_or_else(|| {
                let probe = MethodSignature::new(declaring_type, name, parameters.to_vec(), ClrType::Bool);
                ProviderError::MissingMethodSignature(probe.to_string())
            })
    }

    pub fn resolve_member(&self, declaring_type: &str, name: &str) -> Result<MemberSignature> {
        let signature = MemberSignature::new(declaring_type, name);
        if self.members.contains(&signature) {
            Ok(signature)
        } else {
            Err(ProviderError::MissingMethodSignature(format!("{}.{}", declaring_type, name)))
        }
    }

    /// Every method and member the provider translators expect.
    pub fn standard() -> Self {
        use ClrType::*;
        let p = ParamType::of;
        let mut catalog = Self::new();

        for owner in [DateTime, DateTimeOffset] {
            let o = owner.name().to_string();
            catalog.add_method(MethodSignature::new(&o, "AddYears", vec![p(Int32)], owner.clone()));
            catalog.add_method(MethodSignature::new(&o, "AddMonths", vec![p(Int32)], owner.clone()));
            for name in ["AddDays", "AddHours", "AddMinutes", "AddSeconds", "AddMilliseconds"] {
                catalog.add_method(MethodSignature::new(&o, name, vec![p(Double)], owner.clone()));
            }
        }

        for (unit, _) in DATE_DIFF_UNITS {
            let name = format!("DateDiff{}", unit);
            let mut operands = vec![DateTime, DateTimeOffset];
            if accepts_time_span(unit) {
                operands.push(TimeSpan);
            }
            for operand in operands {
                for nullable in [false, true] {
                    let param = ParamType {
                        clr_type: operand.clone(),
                        nullable,
                    };
                    catalog.add_method(MethodSignature::new(
                        DB_FUNCTIONS,
                        &name,
                        vec![p(DbFunctions), param.clone(), param],
                        Int32,
                    ));
                }
            }
        }

        let convert_targets = [
            ("ToByte", Byte),
            ("ToDecimal", Decimal),
            ("ToDouble", Double),
            ("ToInt16", Int16),
            ("ToInt32", Int32),
            ("ToInt64", Int64),
            ("ToString", String),
        ];
        for (name, target) in convert_targets {
            for source in [Byte, DateTime, Decimal, Double, Single, Int32, Int64, Int16, String] {
                catalog.add_method(MethodSignature::new("Convert", name, vec![p(source)], target.clone()));
            }
        }

        catalog.add_method(MethodSignature::new("Guid", "NewGuid", vec![], Guid));

        for name in ["FreeText", "Contains"] {
            catalog.add_method(MethodSignature::new(
                DB_FUNCTIONS,
                name,
                vec![p(DbFunctions), p(String), p(String)],
                Bool,
            ));
            catalog.add_method(MethodSignature::new(
                DB_FUNCTIONS,
                name,
                vec![p(DbFunctions), p(String), p(String), p(Int32)],
                Bool,
            ));
        }

        for numeric in [Decimal, Double, Single, Int16, Int32, Int64, SByte] {
            catalog.add_method(MethodSignature::new("Math", "Abs", vec![p(numeric.clone())], numeric));
        }
        for numeric in [Decimal, Double] {
            for name in ["Ceiling", "Floor", "Round"] {
                catalog.add_method(MethodSignature::new("Math", name, vec![p(numeric.clone())], numeric.clone()));
            }
            catalog.add_method(MethodSignature::new(
                "Math",
                "Round",
                vec![p(numeric.clone()), p(Int32)],
                numeric.clone(),
            ));
        }

        catalog.add_method(MethodSignature::new("String", "ToUpper", vec![], String));
        catalog.add_method(MethodSignature::new("String", "ToLower", vec![], String));
        catalog.add_method(MethodSignature::new("String", "Trim", vec![], String));
        catalog.add_method(MethodSignature::new("String", "Substring", vec![p(Int32), p(Int32)], String));
        catalog.add_method(MethodSignature::new("String", "Replace", vec![p(String), p(String)], String));

        catalog.add_member(MemberSignature::new("String", "Length"));
        for member in ["Now", "Today", "Year", "Month", "Day", "Hour", "Minute", "Second"] {
            catalog.add_member(MemberSignature::new("DateTime", member));
        }
        catalog
    }
}
