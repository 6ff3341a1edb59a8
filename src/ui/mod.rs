// UI module - text screens rendered from askama templates, terminal input

pub mod login;
pub mod result_sheet;
pub mod scanner;
pub mod terminal;
