//! This module defines various unit types and their conversions.
//!
//! Fuel heat content is measured in GJ, electrical energy in MWh, capacity in MW and emissions in
//! kg, except where an emissions price is given per tonne.

macro_rules! unit_struct {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            PartialOrd,
            Default,
            serde::Serialize,
            serde::Deserialize,
            derive_more::Add,
            derive_more::Sub,
            derive_more::Display,
        )]
        #[serde(transparent)]
        pub struct $name(pub f64);

        impl $name {
            /// Create a new instance of the unit type from a f64 value.
            pub const fn new(val: f64) -> Self {
                Self(val)
            }

            /// Returns the value of the unit type as a f64.
            pub const fn value(self) -> f64 {
                self.0
            }

            /// Whether the underlying value is neither infinite nor NaN
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }
        }

        impl From<$name> for f64 {
            fn from(val: $name) -> Self {
                val.0
            }
        }

        impl std::ops::Mul<Dimensionless> for $name {
            type Output = $name;
            fn mul(self, rhs: Dimensionless) -> $name {
                $name(self.0 * rhs.0)
            }
        }

        impl std::ops::Div<Dimensionless> for $name {
            type Output = $name;
            fn div(self, rhs: Dimensionless) -> $name {
                $name(self.0 / rhs.0)
            }
        }
    };
}

macro_rules! impl_mul {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl std::ops::Mul<$Rhs> for $Lhs {
            type Output = $Out;
            fn mul(self, rhs: $Rhs) -> $Out {
                <$Out>::new(self.0 * rhs.0)
            }
        }
        impl std::ops::Mul<$Lhs> for $Rhs {
            type Output = $Out;
            fn mul(self, lhs: $Lhs) -> $Out {
                <$Out>::new(self.0 * lhs.0)
            }
        }
    };
}

/// Represents a dimensionless quantity (fractions, efficiencies, factors).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    PartialOrd,
    Default,
    serde::Serialize,
    serde::Deserialize,
    derive_more::Add,
    derive_more::Sub,
    derive_more::Display,
)]
#[serde(transparent)]
pub struct Dimensionless(pub f64);

impl Dimensionless {
    /// Create a new dimensionless value
    pub const fn new(val: f64) -> Self {
        Self(val)
    }

    /// Returns the value as a f64.
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Whether the underlying value is neither infinite nor NaN
    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }

    /// The reciprocal of this value
    pub fn recip(self) -> Self {
        Self(self.0.recip())
    }
}

impl From<Dimensionless> for f64 {
    fn from(val: Dimensionless) -> Self {
        val.0
    }
}

impl std::ops::Mul for Dimensionless {
    type Output = Dimensionless;

    fn mul(self, rhs: Dimensionless) -> Self::Output {
        Dimensionless(self.0 * rhs.0)
    }
}

impl std::ops::Div for Dimensionless {
    type Output = Dimensionless;

    fn div(self, rhs: Dimensionless) -> Self::Output {
        Dimensionless(self.0 / rhs.0)
    }
}

unit_struct!(
    /// Price of fuel heat content (EUR/GJ)
    MoneyPerHeat
);
unit_struct!(
    /// Fuel heat content needed per unit of electricity (GJ/MWh)
    HeatPerEnergy
);
unit_struct!(
    /// Fuel heat content needed per unit of capacity changed (GJ/MW)
    HeatPerCapacity
);
unit_struct!(
    /// Cost per unit of electricity (EUR/MWh)
    MoneyPerEnergy
);
unit_struct!(
    /// Cost per unit of capacity started or ramped (EUR/MW)
    MoneyPerCapacity
);
unit_struct!(
    /// Emission factor of a fuel (kg/GJ)
    EmissionsPerHeat
);
unit_struct!(
    /// Emissions per unit of electricity (kg/MWh)
    EmissionsPerEnergy
);
unit_struct!(
    /// Emissions per unit of capacity started or ramped (kg/MW)
    EmissionsPerCapacity
);
unit_struct!(
    /// Price of emissions (EUR/t)
    MoneyPerEmissions
);

impl_mul!(MoneyPerHeat, HeatPerEnergy, MoneyPerEnergy);
impl_mul!(MoneyPerHeat, HeatPerCapacity, MoneyPerCapacity);
impl_mul!(EmissionsPerHeat, HeatPerEnergy, EmissionsPerEnergy);
impl_mul!(EmissionsPerHeat, HeatPerCapacity, EmissionsPerCapacity);

/// Kilograms in a tonne
const KG_PER_TONNE: f64 = 1000.0;

impl std::ops::Mul<MoneyPerEmissions> for EmissionsPerHeat {
    type Output = MoneyPerHeat;

    /// Emission factors are in kg whereas prices are per tonne
    fn mul(self, rhs: MoneyPerEmissions) -> MoneyPerHeat {
        MoneyPerHeat(self.0 * rhs.0 / KG_PER_TONNE)
    }
}

impl HeatPerEnergy {
    /// GJ of heat per MWh of electricity at 100% efficiency
    pub const PER_MWH: HeatPerEnergy = HeatPerEnergy(3.6);
}
