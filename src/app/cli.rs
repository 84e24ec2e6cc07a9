use std::{io::Write, str::FromStr};

use anyhow::Result;

use crate::app::{
    command::{MenuCommand, MENU},
    input::LineSource,
};
use crate::error::ManagerError;
use crate::manager::task_manager::TaskManager;
use crate::models::task::NO_RESULT;

enum Reply<T> {
    Value(T),
    Invalid,
    Closed,
}

/// Runs the operator menu until the operator exits or the input closes.
pub fn run_cli(
    manager: &TaskManager,
    input: &mut impl LineSource,
    out: &mut impl Write,
) -> Result<()> {
    let count = loop {
        match read_number::<usize>(input, out, "How many tasks do you want to start? ")? {
            Reply::Value(count) => break count,
            Reply::Invalid => writeln!(out, "Please enter a non-negative number.")?,
            Reply::Closed => return exit(out),
        }
    };

    report_started(manager.start_tasks(count), out)?;

    loop {
        write!(out, "{}", MENU)?;
        let Some(line) = prompt(input, out, "Choose an option: ")? else {
            return exit(out);
        };

        match MenuCommand::parse(&line) {
            Some(MenuCommand::ListTasks) => show_tasks(manager, out)?,
            Some(MenuCommand::ShowResult) => {
                match read_number::<u64>(input, out, "Enter task ID: ")? {
                    Reply::Value(id) => show_task_result(manager, id, out)?,
                    Reply::Invalid => writeln!(out, "Invalid task ID format.")?,
                    Reply::Closed => return exit(out),
                }
            }
            Some(MenuCommand::CancelTask) => {
                match read_number::<u64>(input, out, "Enter task ID to cancel: ")? {
                    Reply::Value(id) => cancel_task(manager, id, out)?,
                    Reply::Invalid => writeln!(out, "Invalid task ID format.")?,
                    Reply::Closed => return exit(out),
                }
            }
            Some(MenuCommand::ListThreads) => show_active_threads(manager, out)?,
            Some(MenuCommand::StartTask) => match manager.start_single_task() {
                Ok(id) => writeln!(out, "Started new task with ID: {}", id)?,
                Err(e) => writeln!(out, "{}", e)?,
            },
            Some(MenuCommand::Exit) => return exit(out),
            None => writeln!(out, "Invalid option.")?,
        }
    }
}

/// Confirms every started task, including those started before a failure.
fn report_started(started: Result<Vec<u64>, ManagerError>, out: &mut impl Write) -> Result<()> {
    let (ids, failure) = match started {
        Ok(ids) => (ids, None),
        Err(ManagerError::PartialStart { started, source }) => (started, Some(*source)),
        Err(e) => (Vec::new(), Some(e)),
    };
    for id in ids {
        writeln!(out, "Started task with ID: {}", id)?;
    }
    if let Some(e) = failure {
        writeln!(out, "{}", e)?;
    }
    Ok(())
}

fn exit(out: &mut impl Write) -> Result<()> {
    writeln!(out, "Exiting...")?;
    out.flush()?;
    Ok(())
}

fn prompt(input: &mut impl LineSource, out: &mut impl Write, text: &str) -> Result<Option<String>> {
    write!(out, "{}", text)?;
    out.flush()?;
    Ok(input.read_line(text)?)
}

fn read_number<T: FromStr>(
    input: &mut impl LineSource,
    out: &mut impl Write,
    text: &str,
) -> Result<Reply<T>> {
    Ok(match prompt(input, out, text)? {
        Some(line) => match line.trim().parse() {
            Ok(value) => Reply::Value(value),
            Err(_) => Reply::Invalid,
        },
        None => Reply::Closed,
    })
}

fn show_tasks(manager: &TaskManager, out: &mut impl Write) -> Result<()> {
    let tasks = manager.list_tasks();
    if tasks.is_empty() {
        writeln!(out, "No tasks.")?;
        return Ok(());
    }

    writeln!(out, "Task list:")?;
    for task in tasks {
        writeln!(
            out,
            "ID: {}, Name: {}, Status: {}, Working: {}",
            task.id,
            task.name,
            task.status,
            if task.working { "yes" } else { "no" }
        )?;
        if task.finished {
            writeln!(out, "    Result: {}", task.result.as_deref().unwrap_or(NO_RESULT))?;
        }
    }
    Ok(())
}

fn show_task_result(manager: &TaskManager, id: u64, out: &mut impl Write) -> Result<()> {
    match manager.task_result(id) {
        Ok(result) => writeln!(
            out,
            "Result of task {} ({}): {}",
            result.id, result.name, result.result
        )?,
        Err(e) => writeln!(out, "{}", e)?,
    }
    Ok(())
}

fn cancel_task(manager: &TaskManager, id: u64, out: &mut impl Write) -> Result<()> {
    match manager.cancel_task(id) {
        Ok(()) => writeln!(out, "Task {} cancelled.", id)?,
        Err(ManagerError::NotFound(_) | ManagerError::AlreadyFinished(_)) => writeln!(
            out,
            "Cannot cancel task {} (already finished or does not exist).",
            id
        )?,
        Err(e) => writeln!(out, "{}", e)?,
    }
    Ok(())
}

fn show_active_threads(manager: &TaskManager, out: &mut impl Write) -> Result<()> {
    if manager.thread_count() == 0 {
        writeln!(out, "No threads started.")?;
        return Ok(());
    }

    writeln!(out, "Active threads:")?;
    for thread in manager.active_threads() {
        let native_id = thread
            .native_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            out,
            "Name: {}, ID: {}, Alive: {}, State: {}",
            thread.name,
            native_id,
            if thread.alive { "yes" } else { "no" },
            thread.state
        )?;
    }
    Ok(())
}
