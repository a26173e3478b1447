// TeclaOS runner.
//
// The kernel itself is built as an artifact dependency; build.rs packs it
// into UEFI/BIOS disk images and exports their paths as env variables.
// This binary just boots one of them in QEMU.

fn main() {
    let uefi_path = env!("UEFI_PATH");
    let bios_path = env!("BIOS_PATH");
    let ovmf_code = env!("OVMF_CODE");
    let ovmf_vars = env!("OVMF_VARS");

    // BIOS boot is the fallback: `TECLA_BIOS=1 cargo run`
    let uefi = std::env::var_os("TECLA_BIOS").is_none();

    let mut cmd = std::process::Command::new("qemu-system-x86_64");
    if uefi {
        cmd.arg("-drive")
            .arg(format!("if=pflash,format=raw,readonly=on,file={ovmf_code}"));
        cmd.arg("-drive")
            .arg(format!("if=pflash,format=raw,file={ovmf_vars}"));
        cmd.arg("-drive").arg(format!("format=raw,file={uefi_path}"));
    } else {
        cmd.arg("-drive").arg(format!("format=raw,file={bios_path}"));
    }
    cmd.args(["-m", "256M", "-serial", "stdio"]);

    let status = cmd.status().expect("failed to launch qemu-system-x86_64");
    std::process::exit(status.code().unwrap_or(1));
}
