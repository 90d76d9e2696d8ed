#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Command {
  Consume,
  Exit,
  List,
  Show(i64),
  Unknown,
}

impl Command {
  pub(crate) const USAGE: &str =
    "Available commands: `consume`, `list`, `list ID`, `exit`";

  pub(crate) fn parse(line: &str) -> Self {
    let words = line.split_whitespace().collect::<Vec<_>>();

    match words.as_slice() {
      [word] if word.eq_ignore_ascii_case("consume") => Self::Consume,
      [word]
        if word.eq_ignore_ascii_case("exit")
          || word.eq_ignore_ascii_case("quit") =>
      {
        Self::Exit
      }
      [word] if word.eq_ignore_ascii_case("list") => Self::List,
      [word, id]
        if word.eq_ignore_ascii_case("list")
          && id.bytes().all(|byte| byte.is_ascii_digit()) =>
      {
        id.parse().map_or(Self::Unknown, Self::Show)
      }
      _ => Self::Unknown,
    }
  }
}
