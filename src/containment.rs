//! Hierarchical composition of volumes.
//!
//! A [`MotherVolume`] holds an ordered list of child regions, each placed at
//! an offset in the mother's frame. Children may themselves be mother
//! volumes, to any depth, so a geometry is a tree whose leaves are
//! [`Volume`]s.
//!
//! # Overlaps
//!
//! Children are searched from the most recently added to the first, and the
//! first child containing the point wins. A later child therefore occludes
//! earlier ones wherever they overlap. Listing order, as reported by
//! [`Geometry::names`] and [`Geometry::image_descriptors`], is insertion
//! order.
//!
//! # Resolution
//!
//! [`Geometry::resolve`] always descends to the leaf [`Volume`], subtracting
//! each child's offset on the way down. [`MotherVolume::child_at`] stops at
//! the first level.

use anyhow::{bail, Result};
use nalgebra::Vector2;

use crate::bbox::BBox;
use crate::volume::{Geometry, ImageDescriptor, Volume};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::{InMemory, Mask};
    use crate::material::{Material, PathTable, TabulatedMaterial};
    use crate::volume::OUTSIDE;
    use ndarray::Array2;
    use std::sync::Arc;

    fn material(name: &str, density: f64) -> Arc<dyn Material> {
        Arc::new(
            TabulatedMaterial::new(name, 1.0, density)
                .with_neutron_table(PathTable::new(vec![1.0], vec![vec![density]]).unwrap()),
        )
    }

    /// Fully opaque `width x height` unit-scale volume.
    fn block(name: &str, width: usize, height: usize, density: f64) -> Volume {
        let mask = Mask::new(Array2::ones((height, width))).unwrap();
        Volume::new(
            &InMemory::new(format!("{}.png", name), mask),
            name,
            material(name, density),
            1.0,
        )
        .unwrap()
    }

    #[test]
    fn later_child_wins_in_overlap() {
        let mut mother = MotherVolume::new();
        mother.add_volume(block("a", 4, 4, 1.0), Vector2::zeros());
        mother.add_volume(block("b", 2, 2, 2.0), Vector2::new(1.0, 1.0));

        assert_eq!(mother.resolve(2.0, 2.0).map(Volume::name), Some("b"));
        assert_eq!(mother.resolve(0.5, 0.5).map(Volume::name), Some("a"));
        assert_eq!(mother.excitation_and_density(2.0, 2.0), (1.0, 2.0));
        assert_eq!(mother.neutron_mean_free_path(2.0, 2.0, 1.0), vec![2.0]);
        assert_eq!(mother.neutron_mean_free_path(3.5, 3.5, 1.0), vec![1.0]);
    }

    #[test]
    fn offsets_translate_queries() {
        let mut mother = MotherVolume::new();
        mother.add_volume(block("a", 1, 1, 1.0), Vector2::new(10.0, -5.0));
        assert!(mother.is_inside(10.5, -4.5));
        assert!(!mother.is_inside(0.5, 0.5));
    }

    #[test]
    fn nothing_resolves_gives_sentinels() {
        let mut mother = MotherVolume::new();
        mother.add_volume(block("a", 1, 1, 1.0), Vector2::zeros());
        assert!(!mother.is_inside(5.0, 5.0));
        assert_eq!(mother.excitation_and_density(5.0, 5.0), OUTSIDE);
        assert!(mother.neutron_mean_free_path(5.0, 5.0, 1.0).is_empty());
        assert!(mother.gamma_mean_free_path(5.0, 5.0, 1.0).is_empty());
    }

    #[test]
    fn bbox_is_union_of_offset_children() {
        let mut mother = MotherVolume::new();
        assert_eq!(mother.bbox(), None);

        mother.add_volume(block("a", 2, 1, 1.0), Vector2::new(-1.0, 0.0));
        assert_eq!(mother.bbox(), Some(BBox::new(-1.0, 0.0, 1.0, 1.0)));

        mother.add_volume(block("b", 1, 3, 1.0), Vector2::new(2.0, 0.5));
        assert_eq!(mother.bbox(), Some(BBox::new(-1.0, 0.0, 3.0, 3.5)));

        // fully contained child leaves the box alone
        mother.add_volume(block("c", 1, 1, 1.0), Vector2::new(0.0, 1.0));
        assert_eq!(mother.bbox(), Some(BBox::new(-1.0, 0.0, 3.0, 3.5)));
    }

    #[test]
    fn nested_resolution_reaches_leaf() {
        let mut inner = MotherVolume::new();
        inner.add_volume(block("c", 1, 1, 3.0), Vector2::new(1.0, 0.0));

        let mut outer = MotherVolume::new();
        outer.add_volume(block("a", 5, 5, 1.0), Vector2::zeros());
        outer.add_volume(inner, Vector2::new(2.0, 2.0));

        let leaf = outer.resolve(3.5, 2.5).unwrap();
        assert_eq!(leaf.name(), "c");
        assert_eq!(outer.excitation_and_density(3.5, 2.5), (1.0, 3.0));

        // inside the nested mother's box but not in any of its children
        assert_eq!(outer.resolve(2.5, 2.5).map(Volume::name), Some("a"));

        let (index, child) = outer.child_at(3.5, 2.5).unwrap();
        assert_eq!(index, 1);
        assert_eq!(child.names(), vec!["c".to_string()]);
        assert_eq!(outer.bbox(), Some(BBox::new(0.0, 0.0, 5.0, 5.0)));
    }

    #[test]
    fn names_follow_insertion_order() {
        let mut inner = MotherVolume::new();
        inner.add_volume(block("C", 1, 1, 1.0), Vector2::zeros());

        let mut outer = MotherVolume::new();
        outer.add_volume(block("A", 1, 1, 1.0), Vector2::zeros());
        outer.add_volume(block("B", 1, 1, 1.0), Vector2::zeros());
        outer.add_volume(inner, Vector2::zeros());

        assert_eq!(outer.names(), vec!["A", "B", "C"]);
        assert_eq!(outer.resolve(0.5, 0.5).map(Volume::name), Some("C"));
    }

    #[test]
    fn descriptors_are_translated_per_level() {
        let mut inner = MotherVolume::new();
        inner.add_volume(block("c", 1, 2, 1.0), Vector2::new(1.0, 1.0));

        let mut outer = MotherVolume::new();
        outer.add_volume(block("a", 2, 2, 1.0), Vector2::new(0.5, 0.0));
        outer.add_volume(inner, Vector2::new(10.0, 20.0));

        let descriptors = outer.image_descriptors();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].source, "a.png");
        assert_eq!(descriptors[0].bbox, BBox::new(0.5, 0.0, 2.5, 2.0));
        assert_eq!(descriptors[1].source, "c.png");
        assert_eq!(descriptors[1].bbox, BBox::new(11.0, 21.0, 12.0, 23.0));
    }

    #[test]
    fn empty_nested_mother_does_not_affect_bbox() {
        let mut outer = MotherVolume::new();
        outer.add_volume(MotherVolume::new(), Vector2::new(100.0, 100.0));
        assert_eq!(outer.bbox(), None);
        assert!(!outer.is_in_bbox(0.0, 0.0));

        outer.add_volume(block("a", 1, 1, 1.0), Vector2::zeros());
        assert_eq!(outer.bbox(), Some(BBox::new(0.0, 0.0, 1.0, 1.0)));
        assert!(outer.is_in_bbox(1.0, 1.0));
    }

    #[test]
    fn try_new_offsets() {
        let volumes: Vec<Box<dyn Geometry>> = vec![
            Box::new(block("a", 1, 1, 1.0)),
            Box::new(block("b", 1, 1, 1.0)),
        ];
        let mother = MotherVolume::try_new(volumes, vec![]).unwrap();
        assert_eq!(mother.offsets(), &[Vector2::zeros(), Vector2::zeros()]);

        let volumes: Vec<Box<dyn Geometry>> = vec![Box::new(block("a", 1, 1, 1.0))];
        let mismatched = vec![Vector2::zeros(), Vector2::new(1.0, 1.0)];
        assert!(MotherVolume::try_new(volumes, mismatched).is_err());
    }

    #[test]
    fn separate_mothers_do_not_share_children() {
        let mut first = MotherVolume::new();
        let second = MotherVolume::new();
        first.add_volume(block("a", 1, 1, 1.0), Vector2::zeros());
        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }
}

/// An ordered, offset-positioned collection of regions.
#[derive(Debug, Default)]
pub struct MotherVolume {
    children: Vec<Box<dyn Geometry>>,
    offsets: Vec<Vector2<f64>>, // offset of each child in this frame
    bbox: Option<BBox>,
}

impl MotherVolume {
    /// Creates a mother volume with no children and no bounding box.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mother volume from `(child, offset)` pairs, in order.
    pub fn from_children<I>(children: I) -> Self
    where
        I: IntoIterator<Item = (Box<dyn Geometry>, Vector2<f64>)>,
    {
        let (children, offsets) = children.into_iter().unzip();
        let mut mother = Self {
            children,
            offsets,
            bbox: None,
        };
        mother.update_bbox();
        mother
    }

    /// Creates a mother volume from parallel lists. An empty `offsets`
    /// places every child at the origin.
    pub fn try_new(children: Vec<Box<dyn Geometry>>, offsets: Vec<Vector2<f64>>) -> Result<Self> {
        let offsets = if offsets.is_empty() {
            vec![Vector2::zeros(); children.len()]
        } else {
            offsets
        };
        if offsets.len() != children.len() {
            bail!(
                "got {} offsets for {} volumes",
                offsets.len(),
                children.len()
            );
        }
        Ok(Self::from_children(children.into_iter().zip(offsets)))
    }

    /// Appends a child at `offset`. It takes precedence over every earlier
    /// child it overlaps.
    pub fn add_volume<G>(&mut self, volume: G, offset: Vector2<f64>)
    where
        G: Geometry + 'static,
    {
        self.add_boxed(Box::new(volume), offset);
    }

    pub fn add_boxed(&mut self, volume: Box<dyn Geometry>, offset: Vector2<f64>) {
        self.children.push(volume);
        self.offsets.push(offset);
        self.update_bbox();
    }

    /// The child containing `(x, y)` at this level only, with its index.
    /// The point is tested in each child's frame, latest child first.
    pub fn child_at(&self, x: f64, y: f64) -> Option<(usize, &dyn Geometry)> {
        self.children
            .iter()
            .zip(&self.offsets)
            .enumerate()
            .rev()
            .find(|(_, (child, offset))| child.is_inside(x - offset.x, y - offset.y))
            .map(|(i, (child, _))| (i, child.as_ref()))
    }

    pub fn children(&self) -> &[Box<dyn Geometry>] {
        &self.children
    }

    pub fn offsets(&self) -> &[Vector2<f64>] {
        &self.offsets
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Recomputes the bounding box as the union of the children's offset
    /// boxes. Empty children contribute nothing.
    fn update_bbox(&mut self) {
        self.bbox = BBox::union_all(
            self.children
                .iter()
                .zip(&self.offsets)
                .filter_map(|(child, offset)| child.bbox().map(|b| b.translated(offset))),
        );
    }
}

impl Geometry for MotherVolume {
    fn bbox(&self) -> Option<BBox> {
        self.bbox
    }

    fn resolve(&self, x: f64, y: f64) -> Option<&Volume> {
        self.children
            .iter()
            .zip(&self.offsets)
            .rev()
            .find_map(|(child, offset)| child.resolve(x - offset.x, y - offset.y))
    }

    fn image_descriptors(&self) -> Vec<ImageDescriptor> {
        self.children
            .iter()
            .zip(&self.offsets)
            .flat_map(|(child, offset)| {
                child
                    .image_descriptors()
                    .into_iter()
                    .map(move |d| ImageDescriptor {
                        source: d.source,
                        bbox: d.bbox.translated(offset),
                    })
            })
            .collect()
    }

    fn names(&self) -> Vec<String> {
        self.children.iter().flat_map(|child| child.names()).collect()
    }
}
