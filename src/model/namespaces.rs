//! Schema namespaces of the 2010-04 OME-XML revision.

pub const OME_NS: &str = "http://www.openmicroscopy.org/Schemas/OME/2010-04";
pub const SPW_NS: &str = "http://www.openmicroscopy.org/Schemas/SPW/2010-04";
pub const SA_NS: &str = "http://www.openmicroscopy.org/Schemas/SA/2010-04";
pub const ROI_NS: &str = "http://www.openmicroscopy.org/Schemas/ROI/2010-04";
pub const BIN_NS: &str = "http://www.openmicroscopy.org/Schemas/BinaryFile/2010-04";
