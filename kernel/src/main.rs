#![no_std]
#![no_main]
#![feature(abi_x86_interrupt)]
#![cfg_attr(test, feature(custom_test_frameworks))]
#![cfg_attr(test, test_runner(crate::testing::test_runner))]
#![cfg_attr(test, reexport_test_harness_main = "test_main")]

mod framebuffer;
mod interrupts;
mod keyboard;
mod panic;
mod repl;
mod serial;
mod string;
mod syscall;
#[cfg(test)]
mod testing;

use bootloader_api::config::Mapping;
use bootloader_api::{entry_point, BootInfo, BootloaderConfig};
use lazy_static::lazy_static;

#[cfg(not(test))]
use crate::framebuffer::Color;
use crate::framebuffer::{init_global_framebuffer, Framebuffer};
use crate::interrupts::exception::ExceptionStackFrame;
use crate::interrupts::idt::InterruptDescriptorTable;
use crate::interrupts::pic;
use crate::keyboard::KEYBOARD;
#[cfg(not(test))]
use crate::repl::Repl;

/// Vector del dispatcher de syscalls
const SYSCALL_VECTOR: usize = 0x80;

extern "C" {
    fn syscall_entry();
}

lazy_static! {
    static ref IDT: InterruptDescriptorTable = {
        let mut idt = InterruptDescriptorTable::new();
        idt.add_handler(0, divide_by_zero_handler);
        idt.add_handler(6, invalid_opcode_handler);
        idt.add_double_fault_handler(8, double_fault_handler);
        idt.add_handler_with_error(13, general_protection_fault_handler);
        idt.add_handler_with_error(14, page_fault_handler);
        idt.add_handler(pic::Irq::Keyboard.as_u8(), keyboard_interrupt_handler);
        idt.entries[SYSCALL_VECTOR]
            .set_handler_addr(syscall_entry as u64)
            .set_privilege_level(3);
        idt
    };
}

extern "x86-interrupt" fn keyboard_interrupt_handler(_: &mut ExceptionStackFrame) {
    KEYBOARD.interrupt_handler();
    pic::end_of_interrupt(pic::Irq::Keyboard.as_u8());
}

extern "x86-interrupt" fn divide_by_zero_handler(sf: &mut ExceptionStackFrame) {
    panic!("DIVIDE BY ZERO at {:#x}", sf.instruction_pointer);
}

extern "x86-interrupt" fn invalid_opcode_handler(sf: &mut ExceptionStackFrame) {
    panic!("INVALID OPCODE at {:#x}", sf.instruction_pointer);
}

extern "x86-interrupt" fn double_fault_handler(
    sf: &mut ExceptionStackFrame,
    error_code: u64,
) -> ! {
    panic!(
        "DOUBLE FAULT (error: {}) at {:#x}",
        error_code, sf.instruction_pointer
    );
}

extern "x86-interrupt" fn general_protection_fault_handler(
    sf: &mut ExceptionStackFrame,
    error_code: u64,
) {
    panic!(
        "GENERAL PROTECTION FAULT (error: {}) at {:#x}",
        error_code, sf.instruction_pointer
    );
}

extern "x86-interrupt" fn page_fault_handler(sf: &mut ExceptionStackFrame, error_code: u64) {
    let fault_address: u64;
    unsafe {
        core::arch::asm!("mov {}, cr2", out(reg) fault_address);
    }

    panic!(
        "PAGE FAULT\n  Address: {:#x}\n  Error code: {:#b}\n  RIP: {:#x}",
        fault_address, error_code, sf.instruction_pointer
    );
}

pub static BOOTLOADER_CONFIG: BootloaderConfig = {
    let mut config = BootloaderConfig::new_default();
    config.mappings.physical_memory = Some(Mapping::Dynamic);
    config
};

entry_point!(kernel_main, config = &BOOTLOADER_CONFIG);

fn kernel_main(boot_info: &'static mut BootInfo) -> ! {
    serial_println!("TeclaOS: boot");

    let fb = boot_info.framebuffer.as_mut().expect("No framebuffer");
    let info = fb.info();
    let buffer = fb.buffer_mut();

    init_global_framebuffer(Framebuffer::new(
        buffer,
        info.width,
        info.height,
        info.stride,
        info.bytes_per_pixel,
    ));

    IDT.load();
    pic::initialize();

    // Las pruebas manejan el ciclo de vida del driver ellas mismas
    #[cfg(test)]
    {
        x86_64::instructions::interrupts::enable();
        test_main();
    }

    #[cfg(not(test))]
    run();

    loop {
        x86_64::instructions::hlt();
    }
}

#[cfg(not(test))]
fn run() {
    if let Err(e) = KEYBOARD.init() {
        serial_println!("keyboard: init failed: {:?}", e);
    }

    // Self-test del protocolo de comandos: el dispositivo debe ACKear
    // el ciclo enable -> disable -> enable
    let selftest = KEYBOARD
        .enable()
        .and_then(|()| KEYBOARD.disable())
        .and_then(|()| KEYBOARD.enable());
    match selftest {
        Ok(()) => serial_println!("keyboard: scan enable/disable OK"),
        Err(e) => serial_println!("keyboard: command self-test failed: {:?}", e),
    }

    pic::enable_irq(pic::KEYBOARD_IRQ_LINE);
    x86_64::instructions::interrupts::enable();

    serial_println!("TeclaOS: keyboard ready, entering shell");

    {
        let mut fb = framebuffer::FRAMEBUFFER.lock();
        if let Some(fb) = fb.as_mut() {
            fb.clear(Color::rgb(0, 0, 0));
            fb.draw_text(
                10,
                10,
                "TeclaOS v0.1",
                Color::rgb(0, 200, 255),
                Color::rgb(0, 0, 0),
                2,
            );
        }
    }

    let mut repl = Repl::new(10, 50);
    repl.show_prompt();

    loop {
        let c = KEYBOARD.getchar();
        repl.handle_char(c);
    }
}
