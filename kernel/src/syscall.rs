// kernel/src/syscall.rs
//
// Software-interrupt syscall dispatcher (int 0x80).  The assembly stub
// preserves every general-purpose register, hands the saved block to the
// Rust handler and returns the result in RAX.

use core::arch::global_asm;

use crate::keyboard::KEYBOARD;

global_asm!(
    ".global syscall_entry",
    "syscall_entry:",

    // Guardar TODOS los registros
    "push rax",
    "push rbx",
    "push rcx",
    "push rdx",
    "push rsi",
    "push rdi",
    "push rbp",
    "push r8",
    "push r9",
    "push r10",
    "push r11",
    "push r12",
    "push r13",
    "push r14",
    "push r15",

    // RSP apunta al bloque guardado; pasarlo como único argumento
    "mov rdi, rsp",
    "call syscall_handler_asm",

    // Sobreescribir el RAX guardado con el resultado
    "mov [rsp], rax",

    // Restaurar registros
    "pop rax",
    "pop rbx",
    "pop rcx",
    "pop rdx",
    "pop rsi",
    "pop rdi",
    "pop rbp",
    "pop r8",
    "pop r9",
    "pop r10",
    "pop r11",
    "pop r12",
    "pop r13",
    "pop r14",
    "pop r15",

    "iretq",
);

/// Registros tal como los deja la secuencia de push de arriba
#[repr(C)]
struct SavedRegisters {
    r15: u64,
    r14: u64,
    r13: u64,
    r12: u64,
    r11: u64,
    r10: u64,
    r9: u64,
    r8: u64,
    rbp: u64,
    rdi: u64,
    rsi: u64,
    rdx: u64,
    rcx: u64,
    rbx: u64,
    rax: u64,
}

#[no_mangle]
extern "C" fn syscall_handler_asm(regs: &SavedRegisters) -> i64 {
    syscall_handler(
        regs.rax, // syscall_num
        regs.rdi, // arg1
        regs.rsi, // arg2
        regs.rdx, // arg3
    )
}

/// Números de syscall compatibles con Linux x86_64
#[derive(Debug, Clone, Copy)]
#[repr(u64)]
pub enum SyscallNumber {
    Read = 0,
    Write = 1,
}

impl SyscallNumber {
    pub fn from_u64(n: u64) -> Option<Self> {
        match n {
            0 => Some(Self::Read),
            1 => Some(Self::Write),
            _ => None,
        }
    }
}

/// Resultado de una syscall
pub type SyscallResult = i64;

/// Códigos de error compatibles con Linux (negados)
#[allow(dead_code)]
pub mod errno {
    pub const EPERM: i64 = -1;
    pub const ENOENT: i64 = -2;
    pub const EINTR: i64 = -4;
    pub const EIO: i64 = -5;
    pub const EBADF: i64 = -9;
    pub const EFAULT: i64 = -14;
    pub const EINVAL: i64 = -22;
    pub const ENOSYS: i64 = -38;
}

/// Handler principal de syscalls
pub fn syscall_handler(syscall_num: u64, arg1: u64, arg2: u64, arg3: u64) -> SyscallResult {
    let syscall = match SyscallNumber::from_u64(syscall_num) {
        Some(s) => s,
        None => {
            crate::serial_println_raw!("syscall: unknown number {}", syscall_num);
            return errno::ENOSYS;
        }
    };

    match syscall {
        SyscallNumber::Read => sys_read(arg1 as i32, arg2 as usize, arg3 as usize),
        SyscallNumber::Write => sys_write(arg1 as i32, arg2 as usize, arg3 as usize),
    }
}

/// sys_write(fd, buf, count): fd 1/2 van a la consola serial
fn sys_write(fd: i32, buf: usize, count: usize) -> SyscallResult {
    if fd != 1 && fd != 2 {
        return errno::EBADF;
    }
    if buf == 0 {
        return errno::EFAULT;
    }

    let slice = unsafe { core::slice::from_raw_parts(buf as *const u8, count) };

    for &byte in slice {
        unsafe {
            let mut port = x86_64::instructions::port::Port::<u8>::new(0x3F8);
            port.write(byte);
        }
    }

    count as SyscallResult
}

/// sys_read(fd, buf, count): fd 0 lee del teclado.  Bloquea hasta tener
/// el primer byte; el resto se completa sin bloquear.
fn sys_read(fd: i32, buf: usize, count: usize) -> SyscallResult {
    if fd != 0 {
        return errno::EBADF;
    }
    if buf == 0 {
        return errno::EFAULT;
    }
    if count == 0 {
        return 0;
    }

    let slice = unsafe { core::slice::from_raw_parts_mut(buf as *mut u8, count) };

    slice[0] = KEYBOARD.getchar();
    let mut filled = 1;

    while filled < count && KEYBOARD.has_key() {
        if let Some(event) = KEYBOARD.read_key() {
            if event.pressed && event.ascii != 0 {
                slice[filled] = event.ascii;
                filled += 1;
            }
        }
    }

    filled as SyscallResult
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_case]
    fn unknown_number_is_enosys() {
        assert_eq!(syscall_handler(99, 0, 0, 0), errno::ENOSYS);
    }

    #[test_case]
    fn write_rejects_bad_descriptors() {
        let data = *b"x";
        assert_eq!(sys_write(7, data.as_ptr() as usize, 1), errno::EBADF);
        assert_eq!(sys_write(1, 0, 1), errno::EFAULT);
    }

    #[test_case]
    fn write_to_serial_reports_length() {
        let data = *b"syscall write ok\n";
        let written = syscall_handler(1, 1, data.as_ptr() as u64, data.len() as u64);
        assert_eq!(written, data.len() as i64);
    }

    #[test_case]
    fn read_drains_buffered_keys() {
        KEYBOARD.reset_input_state();
        KEYBOARD.inject(0x23); // 'h'
        KEYBOARD.inject(0x17); // 'i'

        let mut buf = [0u8; 8];
        let read = sys_read(0, buf.as_mut_ptr() as usize, buf.len());
        assert_eq!(read, 2);
        assert_eq!(&buf[..2], b"hi");
    }

    #[test_case]
    fn read_validates_arguments() {
        assert_eq!(sys_read(3, 0x1000, 4), errno::EBADF);
        assert_eq!(sys_read(0, 0, 4), errno::EFAULT);
        let mut buf = [0u8; 4];
        assert_eq!(sys_read(0, buf.as_mut_ptr() as usize, 0), 0);
    }
}
