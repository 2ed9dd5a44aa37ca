//! Procedure naming scheme shared by the generator and the VM.

pub fn store(ty: &str) -> String {
    format!("${ty}$_store")
}

pub fn store_cell(ty: &str) -> String {
    format!("${ty}$_store_cell")
}

pub fn store_opt(ty: &str) -> String {
    format!("${ty}$_store_opt")
}

pub fn load(ty: &str) -> String {
    format!("${ty}$_load")
}

pub fn load_no_opcode(ty: &str) -> String {
    format!("${ty}$_load_no_opcode")
}

pub fn load_cell(ty: &str) -> String {
    format!("${ty}$_load_cell")
}

pub fn load_opt(ty: &str) -> String {
    format!("${ty}$_load_opt")
}

pub fn load_bounced(ty: &str) -> String {
    format!("${ty}$_load_bounced")
}

/// Pseudo type name of a contract's init arguments.
pub fn init_id(contract: &str) -> String {
    format!("{contract}$init")
}
