use bitfield_struct::bitfield;

/// Delivery mode of an interprocessor interrupt (ICR bits 8–10).
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[repr(u8)]
pub enum DeliveryMode {
    Fixed = 0b000,
    LowestPriority = 0b001,
    Smi = 0b010,
    Nmi = 0b100,
    /// INIT, or INIT level de-assert when combined with a cleared level bit.
    Init = 0b101,
    /// Start-up (SIPI): the vector is the page number to start executing at.
    Startup = 0b110,
    Reserved = 0b111,
}

impl DeliveryMode {
    #[inline]
    #[must_use]
    pub const fn into_bits(self) -> u8 {
        self as u8
    }

    #[inline]
    #[must_use]
    pub const fn from_bits(v: u8) -> Self {
        match v & 0b111 {
            0b000 => Self::Fixed,
            0b001 => Self::LowestPriority,
            0b010 => Self::Smi,
            0b100 => Self::Nmi,
            0b101 => Self::Init,
            0b110 => Self::Startup,
            _ => Self::Reserved,
        }
    }
}

/// Destination shorthand (ICR bits 18–19).
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[repr(u8)]
pub enum DestinationShorthand {
    /// Use the destination field.
    None = 0b00,
    SelfOnly = 0b01,
    AllIncludingSelf = 0b10,
    AllExcludingSelf = 0b11,
}

impl DestinationShorthand {
    #[inline]
    #[must_use]
    pub const fn into_bits(self) -> u8 {
        self as u8
    }

    #[inline]
    #[must_use]
    pub const fn from_bits(v: u8) -> Self {
        match v & 0b11 {
            0b00 => Self::None,
            0b01 => Self::SelfOnly,
            0b10 => Self::AllIncludingSelf,
            _ => Self::AllExcludingSelf,
        }
    }
}

/// Interrupt Command Register.
///
/// In xAPIC mode this is two 32-bit MMIO registers (low at offset `0x300`,
/// high at `0x310`) and the destination is the 8-bit APIC id in bits 56–63.
/// In x2APIC mode it is the single MSR `0x830` and the destination is the
/// full 32-bit x2APIC id in bits 32–63.
#[bitfield(u64, order = Lsb)]
#[derive(Eq, PartialEq)]
pub struct Icr {
    /// Bits 0–7 — Vector. For start-up IPIs, the 4 KiB page to start at.
    pub vector: u8,

    /// Bits 8–10 — Delivery mode.
    #[bits(3)]
    pub delivery_mode: DeliveryMode,

    /// Bit 11 — Destination mode: 0 = physical, 1 = logical.
    pub logical_destination: bool,

    /// Bit 12 — Delivery status (xAPIC only): set while the IPI is pending.
    #[bits(access = RO)]
    pub delivery_pending: bool,

    /// Bit 13 — Reserved.
    __: bool,

    /// Bit 14 — Level: 0 = de-assert, 1 = assert.
    pub level_assert: bool,

    /// Bit 15 — Trigger mode: 0 = edge, 1 = level.
    pub level_triggered: bool,

    /// Bits 16–17 — Reserved.
    #[bits(2)]
    __: u8,

    /// Bits 18–19 — Destination shorthand.
    #[bits(2)]
    pub shorthand: DestinationShorthand,

    /// Bits 20–31 — Reserved.
    #[bits(12)]
    __: u16,

    /// Bits 32–63 — Destination.
    pub destination: u32,
}

impl Icr {
    /// Level-triggered INIT assert to a physical destination.
    #[must_use]
    pub const fn init_assert(destination: u32) -> Self {
        Self::new()
            .with_delivery_mode(DeliveryMode::Init)
            .with_level_assert(true)
            .with_level_triggered(true)
            .with_destination(destination)
    }

    /// Level-triggered INIT de-assert to a physical destination.
    #[must_use]
    pub const fn init_deassert(destination: u32) -> Self {
        Self::new()
            .with_delivery_mode(DeliveryMode::Init)
            .with_level_triggered(true)
            .with_destination(destination)
    }

    /// Edge-triggered start-up IPI to a physical destination.
    #[must_use]
    pub const fn startup(destination: u32, vector: u8) -> Self {
        Self::new()
            .with_vector(vector)
            .with_delivery_mode(DeliveryMode::Startup)
            .with_destination(destination)
    }

    /// Destination field value addressing xAPIC id `apic_id`.
    #[must_use]
    #[allow(clippy::cast_lossless)]
    pub const fn xapic_destination(apic_id: u8) -> u32 {
        (apic_id as u32) << 24
    }

    /// The low doubleword (xAPIC offset `0x300`).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn low(self) -> u32 {
        self.into_bits() as u32
    }

    /// The high doubleword (xAPIC offset `0x310`).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn high(self) -> u32 {
        (self.into_bits() >> 32) as u32
    }
}
