//! A name → ordered values view over an `http::HeaderMap`.
//!
//! `HeaderMap` stores one entry per value and iterates them flattened. The request
//! pipeline expects the other shape: one entry per name holding all of its values
//! in insertion order, with whole-name replace and remove. `HeaderView` provides
//! that shape on top of the transport's own map. It borrows the map and caches
//! nothing, so every mutation is visible to the transport immediately.

use http::header::{HeaderName, HeaderValue, Keys};
use http::HeaderMap;

use crate::FeatureError;

/// Case-insensitive, multi-valued header access in the pipeline's shape.
#[derive(Debug)]
pub struct HeaderView<'a> {
    map: &'a mut HeaderMap,
}

impl<'a> HeaderView<'a> {
    pub fn new(map: &'a mut HeaderMap) -> Self {
        Self { map }
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.map.keys_len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    /// Returns every value of `name` in insertion order, or `None` if the name is absent.
    pub fn get(&self, name: &str) -> Option<Vec<&HeaderValue>> {
        let values: Vec<_> = self.map.get_all(name).iter().collect();
        if values.is_empty() { None } else { Some(values) }
    }

    /// Replaces all values of `name`. An empty `values` removes the name.
    ///
    /// Nothing is modified when `name` or any of the values is invalid.
    pub fn set<I, V>(&mut self, name: &str, values: I) -> Result<(), FeatureError>
    where
        I: IntoIterator<Item = V>,
        V: TryInto<HeaderValue>,
        V::Error: Into<http::Error>,
    {
        let name = parse_name(name)?;
        let values = values.into_iter().map(parse_value).collect::<Result<Vec<_>, _>>()?;

        self.map.remove(&name);
        for value in values {
            self.map.append(&name, value);
        }
        Ok(())
    }

    /// Appends a value to `name`, keeping the existing ones.
    pub fn add<V>(&mut self, name: &str, value: V) -> Result<(), FeatureError>
    where
        V: TryInto<HeaderValue>,
        V::Error: Into<http::Error>,
    {
        let name = parse_name(name)?;
        let value = parse_value(value)?;
        self.map.append(name, value);
        Ok(())
    }

    /// Removes every value of `name`, returning whether anything was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        self.map.remove(name).is_some()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Yields each name once together with its ordered values.
    ///
    /// Every call starts a fresh pass over the current contents.
    pub fn iter(&self) -> Iter<'_> {
        let map: &HeaderMap = self.map;
        Iter { map, names: map.keys() }
    }
}

/// Iterator returned by [`HeaderView::iter`].
#[derive(Debug)]
pub struct Iter<'a> {
    map: &'a HeaderMap,
    names: Keys<'a, HeaderValue>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a HeaderName, Vec<&'a HeaderValue>);

    fn next(&mut self) -> Option<Self::Item> {
        let name = self.names.next()?;
        Some((name, self.map.get_all(name).iter().collect()))
    }
}

fn parse_name(name: &str) -> Result<HeaderName, FeatureError> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|e| FeatureError::invalid_header(format!("{name:?}: {e}")))
}

fn parse_value<V>(value: V) -> Result<HeaderValue, FeatureError>
where
    V: TryInto<HeaderValue>,
    V::Error: Into<http::Error>,
{
    value.try_into().map_err(|e| FeatureError::invalid_header(e.into()))
}
