pub const MENU: &str = "\n--- MENU ---
1. Show all tasks
2. Show task result
3. Cancel task
4. Show active threads
5. Start new task
6. Exit
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    ListTasks,
    ShowResult,
    CancelTask,
    ListThreads,
    StartTask,
    Exit,
}

impl MenuCommand {
    /// Maps a menu selection line to a command. Anything other than the
    /// numbers 1 to 6 is `None`.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().parse::<u8>().ok()? {
            1 => Some(MenuCommand::ListTasks),
            2 => Some(MenuCommand::ShowResult),
            3 => Some(MenuCommand::CancelTask),
            4 => Some(MenuCommand::ListThreads),
            5 => Some(MenuCommand::StartTask),
            6 => Some(MenuCommand::Exit),
            _ => None,
        }
    }
}
