use std::path::PathBuf;

use ovmf_prebuilt::{Arch, FileType, Prebuilt, Source};

fn main() {
    let out_dir = PathBuf::from(std::env::var("OUT_DIR").unwrap());
    let kernel = PathBuf::from(std::env::var("CARGO_BIN_FILE_KERNEL_kernel").unwrap());

    let uefi_path = out_dir.join("tecla-uefi.img");
    bootloader::UefiBoot::new(&kernel)
        .create_disk_image(&uefi_path)
        .expect("failed to build UEFI disk image");

    let bios_path = out_dir.join("tecla-bios.img");
    bootloader::BiosBoot::new(&kernel)
        .create_disk_image(&bios_path)
        .expect("failed to build BIOS disk image");

    // OVMF firmware for UEFI boots in QEMU
    let prebuilt = Prebuilt::fetch(Source::LATEST, out_dir.join("ovmf"))
        .expect("failed to fetch OVMF prebuilts");
    let ovmf_code = prebuilt.get_file(Arch::X64, FileType::Code);
    let ovmf_vars = prebuilt.get_file(Arch::X64, FileType::Vars);

    println!("cargo:rustc-env=UEFI_PATH={}", uefi_path.display());
    println!("cargo:rustc-env=BIOS_PATH={}", bios_path.display());
    println!("cargo:rustc-env=OVMF_CODE={}", ovmf_code.display());
    println!("cargo:rustc-env=OVMF_VARS={}", ovmf_vars.display());
}
