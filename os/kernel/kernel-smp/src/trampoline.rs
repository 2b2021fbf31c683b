use crate::SmpError;
use kernel_info::memory::{AP_TRAMPOLINE_ADDR, PAGE_SIZE_BITS, REAL_MODE_LIMIT, kib_to_bytes};
use log::debug;

/// The secondary-processor entry code, copied into low memory.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Trampoline {
    address: u64,
    len: usize,
}

impl Trampoline {
    /// Copies `code` into `dest`, the memory at [`AP_TRAMPOLINE_ADDR`].
    ///
    /// The code must end below the lower-memory boundary reported by the
    /// boot loader (and below 1 MiB, where real mode can reach it).
    ///
    /// # Errors
    /// [`SmpError::TrampolineTooLarge`] if the code does not fit below the
    /// boundary or into `dest`. Nothing is copied in that case.
    pub fn place(code: &[u8], dest: &mut [u8], mem_lower_kib: u32) -> Result<Self, SmpError> {
        let limit = kib_to_bytes(mem_lower_kib).min(REAL_MODE_LIMIT);
        let too_large = SmpError::TrampolineTooLarge {
            code_size: code.len(),
            limit,
        };

        let end = u64::try_from(code.len())
            .ok()
            .and_then(|len| AP_TRAMPOLINE_ADDR.checked_add(len))
            .ok_or(too_large)?;
        if end > limit {
            return Err(too_large);
        }

        dest.get_mut(..code.len())
            .ok_or(too_large)?
            .copy_from_slice(code);
        debug!(
            "AP trampoline: {} bytes at {AP_TRAMPOLINE_ADDR:#x}",
            code.len()
        );

        Ok(Self {
            address: AP_TRAMPOLINE_ADDR,
            len: code.len(),
        })
    }

    #[must_use]
    pub const fn address(&self) -> u64 {
        self.address
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The start-up IPI vector: the page number of the trampoline.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn startup_vector(&self) -> u8 {
        (self.address >> PAGE_SIZE_BITS) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_is_copied_and_vector_is_the_page_number() {
        let code = [0xFA, 0xF4, 0xEB, 0xFE];
        let mut dest = [0u8; 16];
        let trampoline = Trampoline::place(&code, &mut dest, 640).unwrap();

        assert_eq!(&dest[..4], &code);
        assert_eq!(trampoline.address(), AP_TRAMPOLINE_ADDR);
        assert_eq!(trampoline.len(), 4);
        assert_eq!(trampoline.startup_vector(), 1);
    }

    #[test]
    fn code_must_end_below_lower_memory() {
        // 8 KiB of lower memory leaves 4 KiB above the trampoline address.
        let code = vec![0x90; 4097];
        let mut dest = vec![0u8; 8192];
        assert_eq!(
            Trampoline::place(&code, &mut dest, 8),
            Err(SmpError::TrampolineTooLarge {
                code_size: 4097,
                limit: 8 * 1024
            })
        );
        assert!(dest.iter().all(|&b| b == 0));

        assert!(Trampoline::place(&code[..4096], &mut dest, 8).is_ok());
        assert!(Trampoline::place(&code[..1025], &mut dest, 5).is_err());
        assert!(Trampoline::place(&code[..1024], &mut dest, 5).is_ok());
    }

    #[test]
    fn destination_must_hold_the_code() {
        let code = [0x90; 8];
        let mut dest = [0u8; 4];
        assert!(matches!(
            Trampoline::place(&code, &mut dest, 640),
            Err(SmpError::TrampolineTooLarge { code_size: 8, .. })
        ));
    }

    #[test]
    fn limit_is_capped_at_real_mode_reach() {
        let code = [0x90; 8];
        let mut dest = [0u8; 8];
        let err = Trampoline::place(&code, &mut dest, 0).unwrap_err();
        assert_eq!(err, SmpError::TrampolineTooLarge { code_size: 8, limit: 0 });

        let trampoline = Trampoline::place(&code, &mut dest, u32::MAX).unwrap();
        assert_eq!(trampoline.len(), 8);
    }
}
