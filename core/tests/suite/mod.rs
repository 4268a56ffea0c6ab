mod human_mode;
mod step_loop;
mod support;
