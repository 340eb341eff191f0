mod create;
mod delete;
mod update;

const TITLE_MAX: usize = 255;
