// This module describes the register classes the allocator hands out. Each class maps to
// one hardware bank, has a register count and an allocation stride (1 for scalar temps, 4
// for aligned vector groups) and owns a contiguous slice of a unified physical-number space
// in declaration order, so class ranges never overlap and a unified number identifies both
// the class and the register inside it. RegisterClassSet is read-only after construction
// and can be shared between concurrent shader compilations; all mutable allocation state
// lives in the per-invocation arena of the allocator.

//! Register classes and their layout.

use std::fmt;

use crate::core::error::ConfigError;
use crate::core::shader::{RegBank, VirtReg};

/// Default number of temporary registers.
pub const DEFAULT_TEMPS: u32 = 248;

/// Default number of internal registers (two vec4 groups).
pub const DEFAULT_INTERNALS: u32 = 8;

/// Allocation class of a virtual register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RegClass {
    /// Scalar temporaries.
    Temp,
    /// Aligned groups of four registers.
    Vec4,
}

impl RegClass {
    pub const ALL: [RegClass; 2] = [RegClass::Temp, RegClass::Vec4];
    pub const COUNT: usize = Self::ALL.len();

    /// Class a virtual register operand belongs to.
    pub fn of(vreg: &VirtReg) -> RegClass {
        if vreg.is_vector() {
            RegClass::Vec4
        } else {
            RegClass::Temp
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// User-facing description of one class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterClassConfig {
    pub bank: RegBank,
    pub count: u32,
    pub stride: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterClass {
    pub class: RegClass,
    pub bank: RegBank,
    pub count: u32,
    pub stride: u32,
    /// First unified number owned by this class.
    pub base: u32,
}

impl RegisterClass {
    /// Number of allocation units (groups of `stride` registers).
    pub fn slots(&self) -> u32 {
        self.count / self.stride
    }

    /// One past the last unified number of the class.
    pub fn end(&self) -> u32 {
        self.base + self.count
    }

    pub fn contains(&self, unified: u32) -> bool {
        (self.base..self.end()).contains(&unified)
    }

    /// Unified number of allocation unit `slot`.
    pub fn slot_base(&self, slot: u32) -> u32 {
        self.base + slot * self.stride
    }
}

impl fmt::Display for RegisterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}: {} x {:?} (stride {}) at [{}, {})",
            self.class,
            self.count,
            self.bank,
            self.stride,
            self.base,
            self.end()
        )
    }
}

/// The full class layout used by one allocator configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterClassSet {
    classes: [RegisterClass; RegClass::COUNT],
}

impl RegisterClassSet {
    /// Build a layout from per-class configs given in [`RegClass::ALL`] order.
    pub fn new(
        temp: RegisterClassConfig,
        vec4: RegisterClassConfig,
    ) -> Result<Self, ConfigError> {
        let mut base: u32 = 0;
        let mut build = |class: RegClass, config: RegisterClassConfig| {
            if config.stride == 0 {
                return Err(ConfigError::ZeroStride { class });
            }
            if config.count % config.stride != 0 {
                return Err(ConfigError::StrideMismatch {
                    class,
                    count: config.count,
                    stride: config.stride,
                });
            }
            if !matches!(config.bank, RegBank::Temp | RegBank::Internal) {
                return Err(ConfigError::BankNotAllocatable {
                    class,
                    bank: config.bank,
                });
            }
            let Some(end) = base.checked_add(config.count) else {
                return Err(ConfigError::LayoutOverflow { class });
            };
            let rc = RegisterClass {
                class,
                bank: config.bank,
                count: config.count,
                stride: config.stride,
                base,
            };
            base = end;
            Ok(rc)
        };

        let temp = build(RegClass::Temp, temp)?;
        let vec4 = build(RegClass::Vec4, vec4)?;
        Ok(Self {
            classes: [temp, vec4],
        })
    }

    /// Layout with the given register counts and the standard banks and strides.
    pub fn with_counts(temps: u32, internals: u32) -> Result<Self, ConfigError> {
        Self::new(
            RegisterClassConfig {
                bank: RegBank::Temp,
                count: temps,
                stride: 1,
            },
            RegisterClassConfig {
                bank: RegBank::Internal,
                count: internals,
                stride: 4,
            },
        )
    }

    /// The hardware's default layout.
    pub fn rogue() -> Self {
        let temp = RegisterClass {
            class: RegClass::Temp,
            bank: RegBank::Temp,
            count: DEFAULT_TEMPS,
            stride: 1,
            base: 0,
        };
        let vec4 = RegisterClass {
            class: RegClass::Vec4,
            bank: RegBank::Internal,
            count: DEFAULT_INTERNALS,
            stride: 4,
            base: DEFAULT_TEMPS,
        };
        Self {
            classes: [temp, vec4],
        }
    }

    pub fn get(&self, class: RegClass) -> &RegisterClass {
        &self.classes[class.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisterClass> {
        self.classes.iter()
    }

    /// Size of the unified number space.
    pub fn total(&self) -> u32 {
        self.classes.iter().map(|c| c.end()).max().unwrap_or(0)
    }

    /// Class owning a unified number.
    pub fn class_of(&self, unified: u32) -> Option<&RegisterClass> {
        self.classes.iter().find(|c| c.contains(unified))
    }
}

impl Default for RegisterClassSet {
    fn default() -> Self {
        Self::rogue()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_is_contiguous() {
        let set = RegisterClassSet::rogue();
        let temp = set.get(RegClass::Temp);
        let vec4 = set.get(RegClass::Vec4);

        assert_eq!(temp.base, 0);
        assert_eq!(temp.end(), vec4.base);
        assert_eq!(vec4.stride, 4);
        assert_eq!(vec4.slots(), 2);
        assert_eq!(set.total(), DEFAULT_TEMPS + DEFAULT_INTERNALS);
        assert_eq!(
            set,
            RegisterClassSet::with_counts(DEFAULT_TEMPS, DEFAULT_INTERNALS).unwrap()
        );
    }

    #[test]
    fn test_class_of_unified_number() {
        let set = RegisterClassSet::with_counts(4, 8).unwrap();
        assert_eq!(set.class_of(3).map(|c| c.class), Some(RegClass::Temp));
        assert_eq!(set.class_of(4).map(|c| c.class), Some(RegClass::Vec4));
        assert_eq!(set.class_of(11).map(|c| c.class), Some(RegClass::Vec4));
        assert!(set.class_of(12).is_none());
        assert_eq!(set.get(RegClass::Vec4).slot_base(1), 8);
    }

    #[test]
    fn test_rejects_bad_configs() {
        assert_eq!(
            RegisterClassSet::with_counts(8, 6),
            Err(ConfigError::StrideMismatch {
                class: RegClass::Vec4,
                count: 6,
                stride: 4
            })
        );

        let zero = RegisterClassConfig {
            bank: RegBank::Temp,
            count: 4,
            stride: 0,
        };
        let vec = RegisterClassConfig {
            bank: RegBank::Internal,
            count: 4,
            stride: 4,
        };
        assert_eq!(
            RegisterClassSet::new(zero, vec),
            Err(ConfigError::ZeroStride {
                class: RegClass::Temp
            })
        );

        let coeff = RegisterClassConfig {
            bank: RegBank::Coeff,
            count: 4,
            stride: 1,
        };
        assert!(matches!(
            RegisterClassSet::new(coeff, vec),
            Err(ConfigError::BankNotAllocatable { .. })
        ));
    }

    #[test]
    fn test_rejects_layout_past_u32() {
        assert_eq!(
            RegisterClassSet::with_counts(u32::MAX, 4),
            Err(ConfigError::LayoutOverflow {
                class: RegClass::Vec4
            })
        );

        let set = RegisterClassSet::with_counts(u32::MAX - 8, 8).unwrap();
        assert_eq!(set.total(), u32::MAX);
        assert_eq!(set.get(RegClass::Vec4).base, u32::MAX - 8);
    }

    #[test]
    fn test_class_of_virtual() {
        use crate::core::shader::Component;
        assert_eq!(RegClass::of(&VirtReg::scalar(0)), RegClass::Temp);
        assert_eq!(
            RegClass::of(&VirtReg::vector(0, Component::Lane(2))),
            RegClass::Vec4
        );
    }
}
