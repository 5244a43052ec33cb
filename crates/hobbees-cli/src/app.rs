//! Command dispatcher and interactive shell.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use hobbees_client::{ApiClient, FileCredentials};
use hobbees_core::{
  Error,
  confirm::Confirm,
  dashboard::HobbyList,
  edit_mode::EditMode,
  error::FieldError,
  form::{Form, FormMode},
  hobby::{CategoryPatch, Hobby, HobbyPatch, NewHobby},
  record::Input,
  schema::SchemaBuilder,
  session::SessionContext,
  view::HobbyView,
};
use serde_json::Value;

use crate::command::{
  Assignment, CategoryCommand, Command, HobbyCommand, ItemCommand, ShellCommand,
  ShellLine, split_words,
};

// ─── Prompt ───────────────────────────────────────────────────────────────────

/// Asks yes/no questions on stdin, or answers yes for `--yes`.
pub struct Prompt {
  /// Fixed answer to every question; `None` asks on stdin.
  answer: Option<bool>,
}

impl Confirm for Prompt {
  fn confirm(&mut self, prompt: &str) -> bool {
    if let Some(answer) = self.answer {
      return answer;
    }
    match read_line(&format!("{prompt} [y/N] ")) {
      Ok(Some(answer)) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
      _ => false,
    }
  }
}

/// Print `prompt` and read one line from stdin. `None` at end of input.
fn read_line(prompt: &str) -> io::Result<Option<String>> {
  print!("{prompt}");
  io::stdout().flush()?;
  let mut line = String::new();
  if io::stdin().lock().read_line(&mut line)? == 0 {
    return Ok(None);
  }
  Ok(Some(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  ))
}

// ─── App ──────────────────────────────────────────────────────────────────────

/// An item form being filled in the shell.
struct Draft {
  category: String,
  form:     Form,
}

/// Top-level application state.
pub struct App {
  /// Unauthenticated client; a bearer clone is made per command.
  client:  ApiClient,
  session: SessionContext<FileCredentials>,
  prompt:  Prompt,

  // Shell-only state.
  edit:    EditMode,
  current: Option<HobbyView<ApiClient>>,
  draft:   Option<Draft>,
}

impl App {
  pub fn new(client: ApiClient, store: FileCredentials, assume_yes: bool) -> Self {
    Self {
      client,
      session: SessionContext::new(store),
      prompt: Prompt { answer: assume_yes.then_some(true) },
      edit: EditMode::default(),
      current: None,
      draft: None,
    }
  }

  /// Resume the stored session, dropping it if the backend rejects it.
  pub async fn restore(&mut self) { self.session.restore(&self.client).await; }

  /// Run one command. Authentication failures end the stored session.
  pub async fn run(&mut self, command: Command) -> Result<()> {
    let result = self.execute(command).await;
    if let Err(e) = &result
      && let Some(error) = e.downcast_ref::<Error>()
      && self.session.observe(error)
    {
      eprintln!("Session expired; log in again.");
    }
    result
  }

  /// A client that authenticates as the current user.
  fn gateway(&self) -> Result<ApiClient> {
    match self.session.token() {
      Some(token) if self.session.is_authenticated() => Ok(self.client.with_token(token)),
      _ => bail!("not logged in; run `hobbees login <username>` first"),
    }
  }

  async fn hobby_list(&self) -> Result<HobbyList<ApiClient>> {
    let mut list = HobbyList::new(self.gateway()?);
    list.load().await?;
    Ok(list)
  }

  /// Resolve a hobby id or name against the user's hobbies.
  fn resolve(list: &HobbyList<ApiClient>, hobby: &str) -> Result<String> {
    list
      .find(hobby)
      .map(|h| h.id.clone())
      .ok_or_else(|| anyhow!("no hobby with id or name {hobby:?}"))
  }

  async fn open(&self, hobby: &str) -> Result<HobbyView<ApiClient>> {
    let list = self.hobby_list().await?;
    let id = Self::resolve(&list, hobby)?;
    Ok(list.open(&id).await?)
  }

  async fn execute(&mut self, command: Command) -> Result<()> {
    match command {
      Command::Register { username, email, password } => {
        let password = password_or_prompt(password)?;
        let user = self
          .session
          .register(&self.client, &username, &email, &password)
          .await?;
        println!("Registered and logged in as {}.", user.username);
      }
      Command::Login { username, password } => {
        let password = password_or_prompt(password)?;
        let user = self.session.login(&self.client, &username, &password).await?;
        println!("Logged in as {}.", user.username);
      }
      Command::Logout => {
        self.session.logout();
        self.current = None;
        self.draft = None;
        println!("Logged out.");
      }
      Command::Whoami => match self.session.user() {
        Some(user) if self.session.is_authenticated() => {
          println!("{} <{}>", user.username, user.email);
        }
        _ => println!("Not logged in."),
      },
      Command::Hobby(cmd) => self.hobby(cmd).await?,
      Command::Category(cmd) => self.category(cmd).await?,
      Command::Item(cmd) => self.item(cmd).await?,
      Command::Shell => self.shell().await?,
    }
    Ok(())
  }

  // ── Hobbies ───────────────────────────────────────────────────────────────

  async fn hobby(&mut self, command: HobbyCommand) -> Result<()> {
    match command {
      HobbyCommand::List => {
        let list = self.hobby_list().await?;
        if list.hobbies().is_empty() {
          println!("No hobbies yet. Create one with `hobbees hobby create <name>`.");
        }
        for hobby in list.hobbies() {
          print_summary(hobby);
        }
      }
      HobbyCommand::Show { hobby } => {
        let view = self.open(&hobby).await?;
        print_hobby(view.hobby());
      }
      HobbyCommand::Create { name, description } => {
        let mut list = HobbyList::new(self.gateway()?);
        let hobby = list.create(NewHobby { name, description }).await?;
        println!("Created hobby {} ({}).", hobby.name, hobby.id);
      }
      HobbyCommand::Update { hobby, name, description } => {
        if name.is_none() && description.is_none() {
          bail!("nothing to update; pass --name and/or --description");
        }
        let mut list = self.hobby_list().await?;
        let id = Self::resolve(&list, &hobby)?;
        let updated = list.update(&id, HobbyPatch { name, description }).await?;
        println!("Updated hobby {}.", updated.name);
      }
      HobbyCommand::Delete { hobby } => {
        let mut list = self.hobby_list().await?;
        let id = Self::resolve(&list, &hobby)?;
        list.delete(&id, &mut self.prompt).await?;
        if self.current.as_ref().is_some_and(|v| v.hobby().id == id) {
          self.current = None;
          self.draft = None;
        }
        println!("Deleted hobby {hobby}.");
      }
    }
    Ok(())
  }

  // ── Categories ────────────────────────────────────────────────────────────

  async fn category(&mut self, command: CategoryCommand) -> Result<()> {
    match command {
      CategoryCommand::Add { hobby, name, fields } => {
        let mut builder = SchemaBuilder::new(name.clone());
        for spec in fields {
          let field = spec.0;
          builder
            .define_field(field.name, field.field_type, field.required)
            .map_err(Error::from)?;
        }
        let schema = builder.finalize().map_err(Error::from)?;
        let mut view = self.open(&hobby).await?;
        view.add_category(schema).await?;
        println!("Added category {name}.");
      }
      CategoryCommand::Update { hobby, category, name, fields } => {
        let fields = (!fields.is_empty()).then(|| fields.into_iter().map(|s| s.0).collect());
        if name.is_none() && fields.is_none() {
          bail!("nothing to update; pass --name and/or --field");
        }
        let mut view = self.open(&hobby).await?;
        view
          .update_category(&category, CategoryPatch { name, fields })
          .await?;
        println!("Updated category {category}.");
      }
      CategoryCommand::Delete { hobby, category } => {
        let mut view = self.open(&hobby).await?;
        view.delete_category(&category, &mut self.prompt).await?;
        println!("Deleted category {category}.");
      }
    }
    Ok(())
  }

  // ── Items ─────────────────────────────────────────────────────────────────

  async fn item(&mut self, command: ItemCommand) -> Result<()> {
    match command {
      ItemCommand::Add { hobby, category, values } => {
        let mut view = self.open(&hobby).await?;
        let mut form = view.item_form(&category)?;
        fill(&mut form, &values)?;
        view.save_form(&category, &form).await?;
        println!("Added item to {category}.");
      }
      ItemCommand::Edit { hobby, category, item, values } => {
        let mut view = self.open(&hobby).await?;
        let mut form = view.edit_form(&category, &item)?;
        fill(&mut form, &values)?;
        if !form.is_dirty() {
          println!("Nothing changed.");
          return Ok(());
        }
        view.save_form(&category, &form).await?;
        println!("Updated item {item}.");
      }
      ItemCommand::Delete { hobby, category, item } => {
        let mut view = self.open(&hobby).await?;
        view.delete_item(&category, &item, &mut self.prompt).await?;
        println!("Deleted item {item}.");
      }
    }
    Ok(())
  }

  // ── Shell ─────────────────────────────────────────────────────────────────

  async fn shell(&mut self) -> Result<()> {
    println!("HobBees shell. Type `help` for commands, `edit` to make changes.");
    loop {
      let prompt = match (&self.current, self.edit) {
        (Some(view), EditMode::Editing { dirty: true }) => {
          format!("{} (edit*)> ", view.hobby().name)
        }
        (Some(view), EditMode::Editing { .. }) => format!("{} (edit)> ", view.hobby().name),
        (Some(view), EditMode::Viewing) => format!("{}> ", view.hobby().name),
        (None, mode) if mode.is_editing() => "hobbees (edit)> ".to_owned(),
        (None, _) => "hobbees> ".to_owned(),
      };
      let Some(line) = tokio::task::block_in_place(|| read_line(&prompt))? else {
        println!();
        break;
      };

      let words = match split_words(&line) {
        Ok(words) if words.is_empty() => continue,
        Ok(words) => words,
        Err(e) => {
          eprintln!("error: {e}");
          continue;
        }
      };
      let command = match ShellLine::try_parse_from(words) {
        Ok(line) => line.command,
        Err(e) => {
          // Help and usage errors alike are printed by clap.
          e.print().ok();
          continue;
        }
      };

      match self.shell_command(command).await {
        Ok(true) => {}
        Ok(false) => break,
        Err(e) => eprintln!("error: {e:#}"),
      }
    }
    Ok(())
  }

  /// Returns `false` when the shell should exit.
  async fn shell_command(&mut self, command: ShellCommand) -> Result<bool> {
    match command {
      ShellCommand::Run(Command::Shell) => println!("Already in the shell."),
      ShellCommand::Run(command) => {
        if command.is_mutation() && !self.edit.is_editing() {
          bail!("read-only; type `edit` to enter edit mode first");
        }
        Box::pin(self.run(command)).await?;
        if let Some(view) = &mut self.current
          && let Err(e) = view.refresh().await
        {
          tracing::debug!(error = %e, "current hobby is gone");
          self.current = None;
          self.draft = None;
        }
      }
      ShellCommand::Edit if self.edit.is_editing() => println!("Already editing."),
      ShellCommand::Edit => {
        self.edit.enter();
        println!("Edit mode on.");
      }
      ShellCommand::Done => {
        if self.edit.exit(&mut self.prompt) {
          self.draft = None;
          println!("Edit mode off.");
        } else {
          println!("Still editing.");
        }
      }
      ShellCommand::Open { hobby } => {
        if !self.may_discard_draft() {
          return Ok(true);
        }
        let view = self.open(&hobby).await?;
        print_hobby(view.hobby());
        self.current = Some(view);
        self.draft = None;
        self.edit.set_dirty(false);
      }
      ShellCommand::Form { category, item } => {
        if !self.edit.is_editing() {
          bail!("read-only; type `edit` to enter edit mode first");
        }
        if !self.may_discard_draft() {
          return Ok(true);
        }
        let view = self.current_view()?;
        let form = match &item {
          Some(item_id) => view.edit_form(&category, item_id)?,
          None => view.item_form(&category)?,
        };
        print_form(&form);
        self.draft = Some(Draft { category, form });
        self.edit.set_dirty(false);
      }
      ShellCommand::Set { values } => {
        let draft = self
          .draft
          .as_mut()
          .ok_or_else(|| anyhow!("no open form; start one with `form <category>`"))?;
        fill(&mut draft.form, &values)?;
        let dirty = draft.form.is_dirty();
        self.edit.set_dirty(dirty);
        print_form(&draft.form);
      }
      ShellCommand::Save => {
        let Some(view) = self.current.as_mut() else {
          bail!("no hobby open; use `open <hobby>`");
        };
        let Some(draft) = self.draft.take() else {
          bail!("no open form; start one with `form <category>`");
        };
        match view.save_form(&draft.category, &draft.form).await {
          Ok(()) => {
            println!("{} saved.", draft.form.title());
            self.edit.set_dirty(false);
          }
          Err(e) => {
            // Keep the input so it can be corrected.
            let expired = self.session.observe(&e);
            self.draft = Some(draft);
            if expired {
              eprintln!("Session expired; log in again.");
            }
            return Err(e.into());
          }
        }
      }
      ShellCommand::Cancel => {
        self.draft = None;
        self.edit.set_dirty(false);
      }
      ShellCommand::Exit => {
        // A dirty editor only leaves once the discard is confirmed.
        return Ok(self.edit.is_dirty() && !self.edit.exit(&mut self.prompt));
      }
    }
    Ok(true)
  }

  /// True if there is no unsaved form input, or the user agrees to lose it.
  fn may_discard_draft(&mut self) -> bool {
    !self.draft.as_ref().is_some_and(|d| d.form.is_dirty())
      || self.prompt.confirm("Discard the open form?")
  }

  fn current_view(&self) -> Result<&HobbyView<ApiClient>> {
    self
      .current
      .as_ref()
      .ok_or_else(|| anyhow!("no hobby open; use `open <hobby>`"))
  }
}

fn password_or_prompt(password: Option<String>) -> Result<String> {
  match password {
    Some(password) => Ok(password),
    None => read_line("Password: ")
      .context("reading password")?
      .ok_or_else(|| anyhow!("no password given")),
  }
}

/// Apply `Name=value` assignments to a form. An empty value clears the input.
fn fill(form: &mut Form, values: &[Assignment]) -> Result<()> {
  for Assignment { field, value } in values {
    let input = if value.is_empty() { Input::Empty } else { Input::text(value.as_str()) };
    form.set(field, input).map_err(|e| match e {
      FieldError::UnknownField => {
        let known: Vec<&str> = form.schema().field_names().collect();
        anyhow!(
          "{} has no field {field:?} (fields: {})",
          form.schema().category_name,
          known.join(", ")
        )
      }
      other => anyhow!("{field}: {other}"),
    })?;
  }
  Ok(())
}

// ─── Output ───────────────────────────────────────────────────────────────────

fn print_summary(hobby: &Hobby) {
  println!(
    "{}  {}  ({} categories, {} items)",
    hobby.id,
    hobby.name,
    hobby.categories.len(),
    hobby.item_count()
  );
}

fn print_hobby(hobby: &Hobby) {
  println!("{} ({})", hobby.name, hobby.id);
  if let Some(description) = hobby.description.as_deref().filter(|d| !d.is_empty()) {
    println!("  {description}");
  }
  if hobby.categories.is_empty() {
    println!("  No categories yet.");
  }
  for category in &hobby.categories {
    let fields: Vec<String> = category
      .schema
      .fields
      .iter()
      .map(|f| {
        let marker = if f.required { "*" } else { "" };
        format!("{}{marker}:{}", f.name, f.field_type)
      })
      .collect();
    println!();
    println!("  {} [{}]", category.name, fields.join(", "));
    if category.items.is_empty() {
      println!("    No items yet.");
    }
    for item in &category.items {
      let values: Vec<String> = category
        .schema
        .fields
        .iter()
        .map(|f| format!("{}: {}", f.name, show_value(item.data.get(&f.name))))
        .collect();
      println!("    {}  {}", item.id, values.join(", "));
    }
  }
}

fn print_form(form: &Form) {
  println!("{}", form.title());
  for field in form.fields() {
    let def = &field.definition;
    let marker = if def.required { "*" } else { " " };
    let changed = if field.input != field.initial { " (changed)" } else { "" };
    println!(
      "  {marker} {} ({}): {}{changed}",
      def.name,
      def.field_type,
      field.input.display()
    );
  }
  if let FormMode::Edit { item_id } = form.mode() {
    println!("  editing {item_id}; `save` to {}", form.submit_label().to_lowercase());
  } else {
    println!("  `save` to {}", form.submit_label().to_lowercase());
  }
}

fn show_value(value: Option<&Value>) -> String {
  match value {
    None | Some(Value::Null) => "-".to_owned(),
    Some(Value::String(s)) if s.is_empty() => "-".to_owned(),
    Some(Value::String(s)) => s.clone(),
    Some(other) => other.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use hobbees_client::ApiConfig;
  use hobbees_core::schema::{CategorySchema, FieldDefinition, FieldType};
  use serde_json::json;

  use super::*;

  fn yarn_form() -> Form {
    let schema = CategorySchema {
      category_name: "Yarn".into(),
      fields:        vec![
        FieldDefinition::new("Brand", FieldType::Text, true),
        FieldDefinition::new("Weight", FieldType::Number, false),
      ],
    };
    Form::render(&schema, None, FormMode::Add)
  }

  fn set(field: &str, value: &str) -> Assignment {
    Assignment { field: field.into(), value: value.into() }
  }

  #[test]
  fn fill_sets_text_inputs() {
    let mut form = yarn_form();
    fill(&mut form, &[set("Brand", "Lion"), set("Weight", "")]).unwrap();
    assert_eq!(form.input("Brand"), Some(&Input::text("Lion")));
    assert_eq!(form.input("Weight"), Some(&Input::Empty));
    assert!(form.is_dirty());
  }

  #[test]
  fn fill_rejects_unknown_fields() {
    let mut form = yarn_form();
    let err = fill(&mut form, &[set("Colour", "red")]).unwrap_err();
    assert!(err.to_string().contains("Brand, Weight"));
  }

  #[test]
  fn values_render_for_display() {
    assert_eq!(show_value(None), "-");
    assert_eq!(show_value(Some(&json!(null))), "-");
    assert_eq!(show_value(Some(&json!("Lion"))), "Lion");
    assert_eq!(show_value(Some(&json!(2.5))), "2.5");
    assert_eq!(show_value(Some(&json!(true))), "true");
  }

  // ── Shell ─────────────────────────────────────────────────────────────

  /// An editing shell with a half-filled Yarn form, answering every prompt
  /// with `answer`. Nothing here reaches the network.
  fn editing_with_draft(dir: &tempfile::TempDir, answer: bool) -> App {
    let client = ApiClient::new(ApiConfig::default()).unwrap();
    let store = FileCredentials::new(dir.path().join("credentials.json"));
    let mut app = App::new(client, store, false);
    app.prompt = Prompt { answer: Some(answer) };
    app.edit.enter();

    let mut form = yarn_form();
    fill(&mut form, &[set("Brand", "Lion")]).unwrap();
    app.draft = Some(Draft { category: "Yarn".into(), form });
    app.edit.set_dirty(true);
    app
  }

  #[tokio::test]
  async fn edit_while_editing_keeps_the_draft_guarded() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = editing_with_draft(&dir, false);

    assert!(app.shell_command(ShellCommand::Edit).await.unwrap());
    assert!(app.edit.is_dirty());

    assert!(app.shell_command(ShellCommand::Done).await.unwrap());
    assert!(app.edit.is_editing());
    assert!(app.draft.is_some());
  }

  #[tokio::test]
  async fn open_asks_before_dropping_a_dirty_form() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = editing_with_draft(&dir, false);

    let open = ShellCommand::Open { hobby: "Chess".into() };
    assert!(app.shell_command(open).await.unwrap());
    assert!(app.draft.as_ref().is_some_and(|d| d.form.is_dirty()));
    assert!(app.edit.is_dirty());
  }

  #[tokio::test]
  async fn confirmed_discard_proceeds_to_open() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = editing_with_draft(&dir, true);

    // Not logged in, so the open itself fails after the discard is agreed.
    let err = app
      .shell_command(ShellCommand::Open { hobby: "Chess".into() })
      .await
      .unwrap_err();
    assert!(err.to_string().contains("not logged in"));
  }
}
