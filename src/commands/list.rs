//! List commands implementation

use kitcommander_core::kit::KitDatabase;

/// List all supported programmers
pub fn list_programmers() {
    print!("{}", kitcommander_kit::programmer_help());
}

/// List all supported kits
pub fn list_kits(db: &KitDatabase, show_firmware: bool) {
    println!("Supported kits:");
    println!();
    println!("{:<16} {:<18} {:<5} Names", "Kit", "Device", "Arch");
    println!("{}", "-".repeat(72));

    for kit in db.iter() {
        println!(
            "{:<16} {:<18} {:<5} {}",
            kit.id,
            kit.device,
            kit.architecture.to_string(),
            kit.names.join(", ")
        );

        if show_firmware {
            for image in &kit.firmware {
                let functions: Vec<&str> = image.functions.iter().map(|f| f.as_str()).collect();
                let protocol = image
                    .protocol
                    .map(|p| format!("{} @ {}", p.id, p.baud))
                    .unwrap_or_else(|| "-".to_string());
                println!("    {} (v{})", image.description, image.version);
                println!("      functions: {}", functions.join(", "));
                println!("      hexfile:   {}", image.hexfile.display());
                println!("      protocol:  {}", protocol);
            }
            println!();
        }
    }
}
