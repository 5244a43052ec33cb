//! The hobby view: category and item management for one hobby.
//!
//! [`HobbyView`] owns the snapshot of the active hobby. Item data is checked
//! against the category's current schema before anything is sent, so invalid
//! input never reaches the gateway. After every successful mutation the
//! snapshot is re-fetched and replaced wholesale; it is never patched or
//! merged locally. Failures leave the previous snapshot in place.

use serde_json::{Map, Value};

use crate::{
  Error, Result,
  confirm::Confirm,
  error::SchemaError,
  form::{Form, FormMode, validate_record},
  gateway::HobbyGateway,
  hobby::{Category, CategoryPatch, Hobby, ItemPayload, NewCategory},
  record::Record,
  schema::CategorySchema,
};

pub struct HobbyView<G> {
  gateway: G,
  hobby:   Hobby,
}

impl<G: HobbyGateway> HobbyView<G> {
  /// Fetch `hobby_id` and open a view on it.
  pub async fn open(gateway: G, hobby_id: &str) -> Result<Self> {
    let hobby = gateway.get_hobby(hobby_id).await?;
    Ok(Self { gateway, hobby })
  }

  /// Open a view on a snapshot the caller already holds.
  pub fn from_snapshot(gateway: G, hobby: Hobby) -> Self {
    Self { gateway, hobby }
  }

  pub fn hobby(&self) -> &Hobby { &self.hobby }

  pub fn gateway(&self) -> &G { &self.gateway }

  /// Replace the snapshot with a fresh copy from the gateway.
  pub async fn refresh(&mut self) -> Result<&Hobby> {
    self.hobby = self.gateway.get_hobby(&self.hobby.id).await?;
    Ok(&self.hobby)
  }

  fn category(&self, name: &str) -> Result<&Category> {
    self
      .hobby
      .category(name)
      .ok_or_else(|| Error::NotFound(format!("Category '{name}' not found")))
  }

  // ── Forms ─────────────────────────────────────────────────────────────

  /// An empty form for adding an item to `category`.
  pub fn item_form(&self, category: &str) -> Result<Form> {
    let category = self.category(category)?;
    Ok(Form::render(&category.schema, None, FormMode::Add))
  }

  /// A form pre-filled with the current data of `item_id`.
  pub fn edit_form(&self, category: &str, item_id: &str) -> Result<Form> {
    let category = self.category(category)?;
    let item = category
      .item(item_id)
      .ok_or_else(|| Error::NotFound("Item not found".into()))?;
    Ok(Form::render(
      &category.schema,
      Some(&item.data),
      FormMode::Edit { item_id: item_id.to_owned() },
    ))
  }

  /// Submit `form` and save the result as a new or updated item.
  pub async fn save_form(&mut self, category: &str, form: &Form) -> Result<()> {
    let record = form.submit()?;
    match form.mode() {
      FormMode::Add => self.dispatch_add(category, &record).await,
      FormMode::Edit { item_id } => {
        self.dispatch_edit(category, item_id, &record).await
      }
    }
  }

  // ── Categories ────────────────────────────────────────────────────────

  /// Create a category from a finished schema.
  pub async fn add_category(&mut self, schema: CategorySchema) -> Result<()> {
    schema.validate()?;
    let body = NewCategory::from(schema);
    tracing::debug!(hobby = %self.hobby.id, category = %body.name, "adding category");
    self.gateway.add_category(&self.hobby.id, &body).await?;
    self.refresh().await?;
    Ok(())
  }

  /// Rename a category or replace its field list.
  ///
  /// Existing items are not migrated: they keep whatever data they had,
  /// even if it no longer matches the new fields.
  pub async fn update_category(
    &mut self,
    category: &str,
    patch: CategoryPatch,
  ) -> Result<()> {
    let current = self.category(category)?;
    if let Some(name) = patch.name.as_deref() {
      if name.trim().is_empty() {
        return Err(SchemaError::BlankCategoryName.into());
      }
      if name != category && self.hobby.category(name).is_some() {
        return Err(SchemaError::DuplicateCategory(name.to_owned()).into());
      }
    }
    if let Some(fields) = &patch.fields {
      CategorySchema {
        category_name: patch.name.clone().unwrap_or_else(|| current.name.clone()),
        fields:        fields.clone(),
      }
      .validate()?;
      if !current.items.is_empty() && *fields != current.schema.fields {
        tracing::warn!(
          category,
          items = current.items.len(),
          "changing fields of a category with items; existing items are not migrated"
        );
      }
    }

    self
      .gateway
      .update_category(&self.hobby.id, category, &patch)
      .await?;
    self.refresh().await?;
    Ok(())
  }

  /// Delete a category and, through the backend, all of its items.
  pub async fn delete_category(
    &mut self,
    category: &str,
    confirm: &mut impl Confirm,
  ) -> Result<()> {
    self.category(category)?;
    let prompt =
      format!("Are you sure you want to delete the category \"{category}\"?");
    if !confirm.confirm(&prompt) {
      return Err(Error::NotConfirmed);
    }
    tracing::debug!(hobby = %self.hobby.id, category, "deleting category");
    self.gateway.delete_category(&self.hobby.id, category).await?;
    self.refresh().await?;
    Ok(())
  }

  // ── Items ─────────────────────────────────────────────────────────────

  /// Validate `data` against the category schema and add it as an item.
  pub async fn add_item(
    &mut self,
    category: &str,
    data: &Map<String, Value>,
  ) -> Result<()> {
    let record = validate_record(&self.category(category)?.schema, data)?;
    self.dispatch_add(category, &record).await
  }

  /// Validate `data` and replace the data of item `item_id`.
  pub async fn edit_item(
    &mut self,
    category: &str,
    item_id: &str,
    data: &Map<String, Value>,
  ) -> Result<()> {
    let record = validate_record(&self.category(category)?.schema, data)?;
    self.dispatch_edit(category, item_id, &record).await
  }

  pub async fn delete_item(
    &mut self,
    category: &str,
    item_id: &str,
    confirm: &mut impl Confirm,
  ) -> Result<()> {
    self.category(category)?;
    if !confirm.confirm("Are you sure you want to delete this item?") {
      return Err(Error::NotConfirmed);
    }
    tracing::debug!(hobby = %self.hobby.id, category, item_id, "deleting item");
    self
      .gateway
      .delete_item(&self.hobby.id, category, item_id)
      .await?;
    self.refresh().await?;
    Ok(())
  }

  async fn dispatch_add(&mut self, category: &str, record: &Record) -> Result<()> {
    tracing::debug!(hobby = %self.hobby.id, category, "adding item");
    self
      .gateway
      .add_item(&self.hobby.id, category, &ItemPayload::from(record))
      .await?;
    self.refresh().await?;
    Ok(())
  }

  async fn dispatch_edit(
    &mut self,
    category: &str,
    item_id: &str,
    record: &Record,
  ) -> Result<()> {
    tracing::debug!(hobby = %self.hobby.id, category, item_id, "updating item");
    self
      .gateway
      .update_item(&self.hobby.id, category, item_id, &ItemPayload::from(record))
      .await?;
    self.refresh().await?;
    Ok(())
  }
}
