/// Sends the interprocessor interrupts that start a secondary processor.
///
/// `target` is the local APIC id of the processor to start.
pub trait IpiSender {
    /// Sends INIT (assert and de-assert where the APIC needs both).
    fn send_init(&mut self, target: u32);

    /// Sends a start-up IPI; the target begins executing in real mode at
    /// physical address `vector << 12`.
    fn send_startup(&mut self, target: u32, vector: u8);
}

impl<T: IpiSender + ?Sized> IpiSender for &mut T {
    fn send_init(&mut self, target: u32) {
        (**self).send_init(target);
    }

    fn send_startup(&mut self, target: u32, vector: u8) {
        (**self).send_startup(target, vector);
    }
}
